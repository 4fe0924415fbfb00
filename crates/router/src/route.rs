//! Static route descriptors and path resolution.

use serde::Serialize;
use tims_auth::Permission;
use tims_auth::permissions::tags;

/// One node of the route tree.
///
/// Descriptors are built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    /// Absolute (`/home`) or relative to the parent (`table-management`, `""`).
    pub path: String,
    pub name: String,
    /// Applies to this node and every descendant.
    pub requires_auth: bool,
    /// Reachable while logged out (login, registration).
    pub public: bool,
    /// Any one of these grants entry.
    pub required_permissions: Vec<Permission>,
    /// Pure alias: resolving this route yields another path.
    pub redirect: Option<String>,
    /// Matches any path no other route matched.
    pub catch_all: bool,
    pub children: Vec<RouteDescriptor>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            requires_auth: false,
            public: false,
            required_permissions: Vec::new(),
            redirect: None,
            catch_all: false,
            children: Vec::new(),
        }
    }

    pub fn alias(path: impl Into<String>, name: impl Into<String>, target: impl Into<String>) -> Self {
        let mut route = Self::new(path, name);
        route.redirect = Some(target.into());
        route
    }

    pub fn catch_all(name: impl Into<String>) -> Self {
        let mut route = Self::new("*", name);
        route.catch_all = true;
        route.public = true;
        route
    }

    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn child(mut self, child: RouteDescriptor) -> Self {
        self.children.push(child);
        self
    }
}

/// The outcome of matching a path against the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub name: String,
    /// Matched path without query or fragment.
    pub path: String,
    /// Path as requested, query included.
    pub full_path: String,
    /// OR over the route and its ancestors.
    pub requires_auth: bool,
    pub public: bool,
    pub required_permissions: Vec<Permission>,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone)]
struct FlatRoute {
    segments: Vec<String>,
    name: String,
    requires_auth: bool,
    public: bool,
    required_permissions: Vec<Permission>,
    redirect: Option<String>,
}

/// The application's route tree plus the two well-known destinations.
#[derive(Debug, Clone)]
pub struct RouteTable {
    roots: Vec<RouteDescriptor>,
    flat: Vec<FlatRoute>,
    fallback: Option<FlatRoute>,
    login_path: String,
    home_path: String,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>, login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        let mut table = Self {
            roots: Vec::new(),
            flat: Vec::new(),
            fallback: None,
            login_path: normalize(login_path.into().as_str()),
            home_path: normalize(home_path.into().as_str()),
        };
        for route in &routes {
            flatten(route, "", false, &mut table.flat, &mut table.fallback);
        }
        table.roots = routes;
        table
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.roots
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    pub fn is_login(&self, route: &ResolvedRoute) -> bool {
        route.path == self.login_path
    }

    /// Match `full_path` (query allowed) against the table.
    ///
    /// Static segments win over `:param` segments and ties go to the deepest
    /// route (the last one flattened). The catch-all is used only when
    /// nothing else matches.
    pub fn resolve(&self, full_path: &str) -> Option<ResolvedRoute> {
        let path = normalize(full_path);
        let segments = split(&path);

        let best = self
            .flat
            .iter()
            .filter(|r| matches(&r.segments, &segments))
            .max_by_key(|r| r.segments.iter().filter(|s| !s.starts_with(':')).count())
            .or(self.fallback.as_ref())?;

        Some(ResolvedRoute {
            name: best.name.clone(),
            path,
            full_path: full_path.to_string(),
            requires_auth: best.requires_auth,
            public: best.public,
            required_permissions: best.required_permissions.clone(),
            redirect: best.redirect.clone(),
        })
    }
}

impl Default for RouteTable {
    /// The stock layout of the web client.
    fn default() -> Self {
        Self::new(
            vec![
                RouteDescriptor::alias("/", "Root", "/login"),
                RouteDescriptor::new("/home", "Home")
                    .requires_auth()
                    .child(RouteDescriptor::new("", "HomeWelcome"))
                    .child(RouteDescriptor::new("table-management", "TableManagement").permissions([tags::TABLE_CREATE]))
                    .child(RouteDescriptor::new("account-management", "AccountManagement").permissions([tags::USER_MANAGE])),
                RouteDescriptor::new("/login", "Login").public(),
                RouteDescriptor::new("/register", "Register").public(),
                RouteDescriptor::catch_all("NotFound"),
            ],
            "/login",
            "/home",
        )
    }
}

fn flatten(
    route: &RouteDescriptor,
    parent: &str,
    parent_auth: bool,
    out: &mut Vec<FlatRoute>,
    fallback: &mut Option<FlatRoute>,
) {
    let requires_auth = parent_auth || route.requires_auth;
    let path = join(parent, &route.path);
    let flat = FlatRoute {
        segments: split(&path),
        name: route.name.clone(),
        requires_auth,
        public: route.public,
        required_permissions: route.required_permissions.clone(),
        redirect: route.redirect.clone(),
    };

    if route.catch_all {
        *fallback = Some(flat);
        return;
    }

    out.push(flat);
    for child in &route.children {
        flatten(child, &path, requires_auth, out, fallback);
    }
}

fn join(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return normalize(child);
    }
    if child.is_empty() {
        return normalize(parent);
    }
    normalize(&format!("{}/{}", parent.trim_end_matches('/'), child))
}

/// Strip query/fragment and trailing slashes; always starts with `/`.
pub fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

fn split(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn matches(pattern: &[String], segments: &[String]) -> bool {
    pattern.len() == segments.len()
        && pattern
            .iter()
            .zip(segments)
            .all(|(p, s)| p.starts_with(':') || p == s)
}
