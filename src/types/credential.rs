//! Network credential types

use std::fmt;
use std::ops::Deref;

/// Maximum meaningful characters in a credential field.
///
/// Mirrors a 64-byte collation buffer with room for a terminator.
pub const MAX_FIELD_CHARS: usize = 63;

/// Text value bounded to [`MAX_FIELD_CHARS`] characters.
///
/// Construction either truncates or refuses over-long input, so a `BoundedText`
/// can always be copied into a fixed-size driver buffer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BoundedText(String);

impl BoundedText {
    /// Keep at most [`MAX_FIELD_CHARS`] characters of `text`.
    ///
    /// Returns the bounded text and whether anything was cut off.
    pub fn truncating(text: &str) -> (Self, bool) {
        match text.char_indices().nth(MAX_FIELD_CHARS) {
            Some((cut, _)) => (Self(text[..cut].to_string()), true),
            None => (Self(text.to_string()), false),
        }
    }

    /// Accept `text` only if it already fits.
    ///
    /// On failure returns the character count of the rejected input.
    pub fn exact(text: &str) -> Result<Self, usize> {
        let chars = text.chars().count();
        if chars > MAX_FIELD_CHARS { Err(chars) } else { Ok(Self(text.to_string())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Character count (not bytes)
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl Deref for BoundedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BoundedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Network name and secret extracted from a decoded payload.
///
/// `Debug` output never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub network: BoundedText,
    pub secret: BoundedText,
}

impl Credential {
    /// Build a credential, truncating both fields to [`MAX_FIELD_CHARS`].
    pub fn new(network: &str, secret: &str) -> Self {
        Self { network: BoundedText::truncating(network).0, secret: BoundedText::truncating(secret).0 }
    }

    /// Network name as text
    pub fn network(&self) -> &str {
        self.network.as_str()
    }

    /// Secret as text
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("network", &self.network)
            .field("secret", &format_args!("<{} chars>", self.secret.char_len()))
            .finish()
    }
}
