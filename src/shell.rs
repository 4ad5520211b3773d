//! Navigation bar contents and the logout action it hosts.

use crate::{identity::Identity, routes::Route, session::SessionStore};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavItem {
    /// Brand link back to the home page.
    Brand,
    Link { label: &'static str, route: Route },
    Logout,
}

/// Items shown in the navigation bar for the given session.
#[must_use]
pub fn nav_items(identity: Option<&Identity>) -> Vec<NavItem> {
    let mut items = vec![NavItem::Brand];
    if identity.is_some() {
        items.extend(
            [
                ("Profile", Route::Profile),
                ("Chat", Route::Chat),
                ("To-Do", Route::Todo),
                ("Files", Route::Files),
            ]
            .into_iter()
            .map(|(label, route)| NavItem::Link { label, route }),
        );
        items.push(NavItem::Logout);
    } else {
        items.push(NavItem::Link {
            label: "Login",
            route: Route::Login,
        });
    }
    items
}

/// Signs the user out and returns where to go next, which is always the login page.
pub async fn logout(session: &SessionStore) -> Route {
    if let Err(err) = session.logout().await {
        error!("Logout failed: {err}");
    }
    Route::Login
}
