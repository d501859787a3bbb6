//! Form field types for the registration flow.
//!
//! A [`FormDraft`] is everything the user has typed or picked so far. It is
//! what gets autosaved, restored on mount and validated on submit.

use crate::avatar::AvatarHandle;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Names of the five form fields
///
/// Serialized in the camelCase form used by the persisted draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    /// Attendee's full name
    FullName,
    /// Contact email
    Email,
    /// Uploaded avatar image
    Avatar,
    /// Selected price tier
    TicketPrice,
    /// Number of tickets
    TicketQuantity,
}

impl FieldName {
    /// All fields in form order
    pub const ALL: [Self; 5] = [
        Self::FullName,
        Self::Email,
        Self::Avatar,
        Self::TicketPrice,
        Self::TicketQuantity,
    ];

    /// Key used in the persisted draft
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::Avatar => "avatar",
            Self::TicketPrice => "ticketPrice",
            Self::TicketQuantity => "ticketQuantity",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket price tiers offered by the form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    /// $50 early-bird ticket
    #[serde(rename = "$50 - Early Bird")]
    EarlyBird,
    /// $75 regular ticket
    #[serde(rename = "$75 - Regular")]
    Regular,
    /// $100 VIP ticket
    #[serde(rename = "$100 - VIP")]
    Vip,
}

impl PriceTier {
    /// Tiers in display order
    pub const ALL: [Self; 3] = [Self::EarlyBird, Self::Regular, Self::Vip];

    /// Label shown on the tier button and on the ticket
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarlyBird => "$50 - Early Bird",
            Self::Regular => "$75 - Regular",
            Self::Vip => "$100 - VIP",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error parsing a [`PriceTier`] label
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown ticket tier: {0:?}")]
pub struct UnknownTier(pub String);

impl FromStr for PriceTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.label() == s)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Number of tickets, 1 through 10
///
/// Serialized as a number. Deserializing also accepts a numeric string,
/// which is how a select submits its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub struct TicketQuantity(u8);

/// Error for a quantity outside 1..=10
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ticket quantity must be between {min} and {max}, got {value}", min = TicketQuantity::MIN, max = TicketQuantity::MAX)]
pub struct QuantityOutOfRange {
    /// Rejected value
    pub value: u8,
}

/// Error for quantity text that is not a whole number in 1..=10
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidQuantity {
    /// Not a whole number
    #[error("ticket quantity is not a number: {0:?}")]
    NotANumber(String),
    /// A number outside the range
    #[error(transparent)]
    OutOfRange(#[from] QuantityOutOfRange),
}

impl TicketQuantity {
    /// Smallest orderable quantity
    pub const MIN: u8 = 1;
    /// Largest orderable quantity
    pub const MAX: u8 = 10;

    /// Creates a quantity
    ///
    /// # Errors
    ///
    /// Returns [`QuantityOutOfRange`] outside `1..=10`.
    pub const fn new(value: u8) -> Result<Self, QuantityOutOfRange> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(QuantityOutOfRange { value })
        }
    }

    /// Creates a quantity, clamping `value` into `1..=10`
    #[must_use]
    pub const fn saturating(value: u8) -> Self {
        if value < Self::MIN {
            Self(Self::MIN)
        } else if value > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(value)
        }
    }

    /// The quantity as a number
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every selectable quantity, in order
    pub fn options() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for TicketQuantity {
    type Error = QuantityOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for TicketQuantity {
    type Err = InvalidQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| InvalidQuantity::NotANumber(s.to_string()))?;
        Ok(Self::new(value)?)
    }
}

impl<'de> Deserialize<'de> for TicketQuantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u8),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Self::new(value).map_err(serde::de::Error::custom),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl From<TicketQuantity> for u8 {
    fn from(quantity: TicketQuantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for TicketQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current value of the avatar field
///
/// A live upload is `Bound`. A draft restored from storage can only carry
/// the old handle's reference string, so it comes back as `Placeholder`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AvatarValue {
    /// Nothing chosen yet
    #[default]
    None,
    /// An image uploaded in this session
    Bound(AvatarHandle),
    /// Reference string carried over from a persisted draft
    Placeholder(String),
}

impl AvatarValue {
    /// The live handle, if an image was uploaded in this session
    #[must_use]
    pub const fn handle(&self) -> Option<&AvatarHandle> {
        match self {
            Self::Bound(handle) => Some(handle),
            Self::None | Self::Placeholder(_) => None,
        }
    }

    /// Whether the field counts as filled in
    ///
    /// True for a bound file or a non-empty placeholder.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bound(_) => true,
            Self::Placeholder(reference) => !reference.is_empty(),
        }
    }

    /// The string written to storage for this value
    #[must_use]
    pub fn persisted(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Bound(handle) => Some(handle.reference()),
            Self::Placeholder(reference) => Some(reference),
        }
    }
}

impl Serialize for AvatarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.persisted().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AvatarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map_or(Self::None, Self::Placeholder))
    }
}

/// In-progress form values
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDraft {
    /// Attendee's full name
    pub full_name: String,
    /// Contact email
    pub email: String,
    /// Avatar upload or restored placeholder
    pub avatar: AvatarValue,
    /// Selected tier
    pub ticket_price: Option<PriceTier>,
    /// Selected quantity
    pub ticket_quantity: Option<TicketQuantity>,
}

impl FormDraft {
    /// Creates an empty draft
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a single field edit
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::FullName(value) => self.full_name = value,
            FieldUpdate::Email(value) => self.email = value,
            FieldUpdate::TicketPrice(tier) => self.ticket_price = Some(tier),
            FieldUpdate::TicketQuantity(quantity) => self.ticket_quantity = Some(quantity),
        }
    }

    /// True when no field has been touched
    #[must_use]
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// One edit to a text or choice field
///
/// The avatar is not edited this way; it goes through the avatar loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    /// New full name
    FullName(String),
    /// New email
    Email(String),
    /// New tier
    TicketPrice(PriceTier),
    /// New quantity
    TicketQuantity(TicketQuantity),
}

impl FieldUpdate {
    /// The field this update writes
    #[must_use]
    pub const fn field(&self) -> FieldName {
        match self {
            Self::FullName(_) => FieldName::FullName,
            Self::Email(_) => FieldName::Email,
            Self::TicketPrice(_) => FieldName::TicketPrice,
            Self::TicketQuantity(_) => FieldName::TicketQuantity,
        }
    }
}
