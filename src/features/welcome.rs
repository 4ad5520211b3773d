//! Home page shown to signed-in users.

use crate::{identity::Identity, routes::Route};

pub const NO_PHOTO: &str = "No Photo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Image(String),
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickLink {
    pub label: &'static str,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub greeting: String,
    pub avatar: Avatar,
    pub links: Vec<QuickLink>,
}

impl Welcome {
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        let greeting = match identity.display_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("Welcome, {name}!"),
            None => "Welcome!".to_string(),
        };
        let avatar = identity
            .photo_url
            .clone()
            .filter(|url| !url.is_empty())
            .map_or(Avatar::Placeholder(NO_PHOTO), Avatar::Image);
        Self {
            greeting,
            avatar,
            links: vec![
                QuickLink {
                    label: "Todo List",
                    route: Route::Todo,
                },
                QuickLink {
                    label: "Chat",
                    route: Route::Chat,
                },
                QuickLink {
                    label: "Edit Profile",
                    route: Route::Profile,
                },
            ],
        }
    }
}
