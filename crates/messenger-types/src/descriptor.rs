//! # Descriptors
//!
//! Namespaces and the `"<Namespace>:<verb>"` names of actions and events.
//!
//! Two ways to refer to a descriptor:
//!
//! - by validated string (`ActionName`, `EventName`), used by allow-lists and
//!   the untyped bus API;
//! - by Rust type implementing `ActionDescriptor` / `EventDescriptor`, which
//!   pins the name as a constant and fixes the payload types so that a typo
//!   in a call site fails to compile.
//!
//! ```rust,ignore
//! define_action!(pub GetPreferences = "PreferencesController:getState", () => Preferences);
//! let prefs = handle.call_typed::<GetPreferences>(()).await?;
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{MessengerError, MessengerResult};
use crate::NAME_SEPARATOR;

/// Identity of one module on the bus (e.g. `SnapController`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the namespace is empty, contains the `:` separator
    /// or contains whitespace.
    pub fn new(namespace: impl Into<String>) -> MessengerResult<Self> {
        let namespace = namespace.into();
        validate_segment(&namespace, &namespace, "namespace is empty")?;
        if namespace.contains(NAME_SEPARATOR) {
            return Err(MessengerError::InvalidName {
                name: namespace,
                reason: "namespace must not contain ':'",
            });
        }
        Ok(Self(namespace))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` is addressed under this namespace (`"<self>:..."`).
    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        name.split_once(NAME_SEPARATOR)
            .is_some_and(|(prefix, _)| prefix == self.0)
    }
}

/// Defines a validated `"<Namespace>:<verb>"` name type.
macro_rules! qualified_name {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $ty(String);

        impl $ty {
            /// Validate and wrap a qualified name.
            ///
            /// # Errors
            ///
            /// `InvalidName` unless the name is exactly `<namespace>:<verb>`
            /// with both parts non-empty and free of whitespace.
            pub fn new(name: impl Into<String>) -> MessengerResult<Self> {
                let name = name.into();
                split_qualified(&name)?;
                Ok(Self(name))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The namespace half of the name.
            #[must_use]
            pub fn namespace(&self) -> &str {
                self.0
                    .split_once(NAME_SEPARATOR)
                    .map_or(self.0.as_str(), |(ns, _)| ns)
            }

            /// The verb half of the name.
            #[must_use]
            pub fn verb(&self) -> &str {
                self.0
                    .split_once(NAME_SEPARATOR)
                    .map_or("", |(_, verb)| verb)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $ty {
            type Err = MessengerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = MessengerError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = MessengerError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

qualified_name!(
    /// Name of a callable operation, e.g. `SnapController:handleRequest`.
    ActionName
);

qualified_name!(
    /// Name of a notification, e.g. `KeyringController:unlock`.
    EventName
);

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Namespace {
    type Err = MessengerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = MessengerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Namespace {
    type Error = MessengerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

/// Split `"<namespace>:<verb>"`, rejecting anything else.
///
/// # Errors
///
/// `InvalidName` describing the first rule the name breaks.
pub fn split_qualified(name: &str) -> MessengerResult<(&str, &str)> {
    let Some((namespace, verb)) = name.split_once(NAME_SEPARATOR) else {
        return Err(MessengerError::InvalidName {
            name: name.to_string(),
            reason: "expected <Namespace>:<verb>",
        });
    };
    if verb.contains(NAME_SEPARATOR) {
        return Err(MessengerError::InvalidName {
            name: name.to_string(),
            reason: "more than one ':' separator",
        });
    }
    validate_segment(name, namespace, "namespace is empty")?;
    validate_segment(name, verb, "verb is empty")?;
    Ok((namespace, verb))
}

fn validate_segment(name: &str, segment: &str, empty_reason: &'static str) -> MessengerResult<()> {
    if segment.is_empty() {
        return Err(MessengerError::InvalidName {
            name: name.to_string(),
            reason: empty_reason,
        });
    }
    if segment.chars().any(char::is_whitespace) {
        return Err(MessengerError::InvalidName {
            name: name.to_string(),
            reason: "whitespace is not allowed",
        });
    }
    Ok(())
}

/// A callable operation known at compile time.
pub trait ActionDescriptor: Send + Sync + 'static {
    /// Fully qualified action name.
    const NAME: &'static str;
    /// Request payload.
    type Request: Serialize + DeserializeOwned + Send + 'static;
    /// Response payload.
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// A notification known at compile time.
pub trait EventDescriptor: Send + Sync + 'static {
    /// Fully qualified event name.
    const NAME: &'static str;
    /// Event payload.
    type Payload: Serialize + DeserializeOwned + Send + 'static;
}

/// Declare a zero-sized type implementing [`ActionDescriptor`].
#[macro_export]
macro_rules! define_action {
    ($(#[$meta:meta])* $vis:vis $ty:ident = $name:literal, $req:ty => $resp:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $ty;

        impl $crate::ActionDescriptor for $ty {
            const NAME: &'static str = $name;
            type Request = $req;
            type Response = $resp;
        }
    };
}

/// Declare a zero-sized type implementing [`EventDescriptor`].
#[macro_export]
macro_rules! define_event {
    ($(#[$meta:meta])* $vis:vis $ty:ident = $name:literal, $payload:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $ty;

        impl $crate::EventDescriptor for $ty {
            const NAME: &'static str = $name;
            type Payload = $payload;
        }
    };
}
