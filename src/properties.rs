//! Property Rules: the closed policy for which properties `SetProperty` may touch.

use strum_macros::{AsRefStr, Display, EnumString};

/// Native properties this core allows through the generic set-property verb.
/// `mountpoint` is deliberately absent: it's writable only via clone-time
/// overrides, never routed through `set_property`.
#[derive(AsRefStr, EnumString, Display, Eq, PartialEq, Debug, Clone, Copy)]
pub enum AuthorizedProperty {
    #[strum(serialize = "canmount")]
    CanMount,
    #[strum(serialize = "bootfs")]
    Bootfs,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PropertyClass {
    Authorized(AuthorizedProperty),
    User,
    Forbidden,
}

/// A user property is namespaced with a colon, e.g. `org.zsys:bootfs-datasets`.
fn is_user_property(name: &str) -> bool { name.contains(':') }

pub struct PropertyRules;

impl PropertyRules {
    /// Classifies `name` for the purposes of `SetProperty`. Pure and total: every
    /// string has exactly one class.
    pub fn classify(name: &str) -> PropertyClass {
        if let Ok(authorized) = name.parse::<AuthorizedProperty>() {
            return PropertyClass::Authorized(authorized);
        }
        if is_user_property(name) {
            return PropertyClass::User;
        }
        PropertyClass::Forbidden
    }
}
