//! Backend-delivered route trees and the side menu built from them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub require_auth: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A route node as the backend sends it (login response, route endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRoute {
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub meta: Option<RouteMeta>,
    #[serde(default)]
    pub children: Vec<BackendRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub path: String,
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// Title falls back to the route name, then the path.
pub fn transform_routes_to_menu(routes: &[BackendRoute]) -> Vec<MenuItem> {
    routes
        .iter()
        .map(|route| {
            let meta = route.meta.as_ref();
            MenuItem {
                path: route.path.clone(),
                name: route.name.clone(),
                title: meta
                    .and_then(|m| m.title.clone())
                    .or_else(|| (!route.name.is_empty()).then(|| route.name.clone()))
                    .unwrap_or_else(|| route.path.clone()),
                icon: meta.and_then(|m| m.icon.clone()),
                children: transform_routes_to_menu(&route.children),
            }
        })
        .collect()
}
