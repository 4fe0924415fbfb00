//! Command-line commands. Each one returns a JSON value for stdout.

use anyhow::{Context, bail};
use serde_json::{Value, json};

use tims_client::api::{table, user};
use tims_router::{redirect_target, transform_routes_to_menu};

use crate::state::AppState;

pub const USAGE: &str = "usage: tims <login <work-id> <password> | logout | whoami | tables | open <path>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { id: String, password: String },
    Logout,
    Whoami,
    Tables,
    Open { path: String },
}

impl Command {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> anyhow::Result<Self> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let command = match args.as_slice() {
            ["login", id, password] => Command::Login {
                id: id.to_string(),
                password: password.to_string(),
            },
            ["logout"] => Command::Logout,
            ["whoami"] => Command::Whoami,
            ["tables"] => Command::Tables,
            ["open", path] => Command::Open { path: path.to_string() },
            [] => bail!("missing command\n{USAGE}"),
            [other, ..] => bail!("unknown or incomplete command `{other}`\n{USAGE}"),
        };
        Ok(command)
    }
}

pub async fn run(state: &AppState, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Login { id, password } => login(state, id, password).await,
        Command::Logout => {
            user::logout(&state.pipeline).context("logged out, but the saved session could not be removed")?;
            Ok(json!({ "loggedIn": false }))
        }
        Command::Whoami => Ok(whoami(state)),
        Command::Tables => {
            let tables = table::list_tables(&state.pipeline).await.context("failed to list tables")?;
            Ok(serde_json::to_value(tables)?)
        }
        Command::Open { path } => {
            let arrival = state
                .navigator
                .navigate(&path)
                .with_context(|| format!("failed to open {path}"))?;
            Ok(json!({
                "requested": path,
                "location": arrival.location.full_path,
                "route": arrival.location.route_name,
                "redirected": arrival.redirected,
            }))
        }
    }
}

async fn login(state: &AppState, id: String, password: String) -> anyhow::Result<Value> {
    let params = user::LoginParams { id, password };
    let vo = user::login_and_store(&state.pipeline, &params)
        .await
        .context("login failed")?;

    let menu = vo
        .route
        .as_ref()
        .map(|route| transform_routes_to_menu(std::slice::from_ref(route)))
        .unwrap_or_default();

    // Go back to the page that sent us to login, or home.
    let return_to = state
        .navigator
        .current()
        .and_then(|location| redirect_target(&location.full_path))
        .unwrap_or_else(|| state.navigator.table().home_path().to_string());
    let arrival = state
        .navigator
        .navigate(&return_to)
        .with_context(|| format!("logged in, but failed to open {return_to}"))?;

    Ok(json!({
        "location": arrival.location.full_path,
        "id": vo.word_id,
        "username": vo.username,
        "expireAt": vo.expire_at,
        "permissions": vo.permissions,
        "menu": menu,
    }))
}

fn whoami(state: &AppState) -> Value {
    match state.session.snapshot() {
        Some(session) => json!({
            "loggedIn": true,
            "id": session.identity.id,
            "displayName": session.identity.display_name,
            "avatar": session.identity.avatar,
            "expireAt": session.expire_at,
            "permissions": session.permissions,
        }),
        None => json!({ "loggedIn": false }),
    }
}
