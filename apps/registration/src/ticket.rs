//! Ticket generation.
//!
//! A [`Ticket`] is built once per successful submit from the validated
//! draft, the live avatar handle and a fresh 12-digit [`BarcodeValue`].

use crate::avatar::AvatarHandle;
use crate::types::{FieldName, FormDraft, PriceTier, TicketQuantity};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use thiserror::Error;

/// The 12-digit number encoded in a ticket's barcode
///
/// Identifiers are drawn at random and not checked for uniqueness, so two
/// tickets can collide (with probability about 1 in 9 × 10¹¹).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BarcodeValue(String);

/// A value outside the 12-digit range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("barcode value must be 12 digits in {min}..={max}, got {0:?}", min = BarcodeValue::MIN, max = BarcodeValue::MAX)]
pub struct InvalidBarcodeValue(pub String);

impl BarcodeValue {
    /// Smallest identifier
    pub const MIN: u64 = 100_000_000_000;
    /// Largest identifier
    pub const MAX: u64 = 999_999_999_999;

    /// Wraps a number
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBarcodeValue`] outside [`MIN`](Self::MIN)..=[`MAX`](Self::MAX).
    pub fn from_number(value: u64) -> Result<Self, InvalidBarcodeValue> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidBarcodeValue(value.to_string()))
        }
    }

    /// The smallest identifier, `100000000000`
    #[must_use]
    pub fn lowest() -> Self {
        Self(Self::MIN.to_string())
    }

    /// Decimal digits
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value
    #[must_use]
    pub fn as_number(&self) -> u64 {
        // Construction guarantees 12 ASCII digits
        self.0.bytes().fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
    }
}

impl std::str::FromStr for BarcodeValue {
    type Err = InvalidBarcodeValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidBarcodeValue(s.to_string()));
        }
        s.parse::<u64>()
            .map_err(|_| InvalidBarcodeValue(s.to_string()))
            .and_then(Self::from_number)
    }
}

impl fmt::Display for BarcodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of ticket identifiers
pub trait BarcodeSource: Send + Sync {
    /// Next identifier
    fn next_value(&self) -> BarcodeValue;
}

/// Uniform random identifiers from the thread RNG
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomBarcodeSource;

impl BarcodeSource for RandomBarcodeSource {
    fn next_value(&self) -> BarcodeValue {
        let value = rand::thread_rng().gen_range(BarcodeValue::MIN..=BarcodeValue::MAX);
        BarcodeValue(value.to_string())
    }
}

/// Why a ticket could not be generated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// No image uploaded in this session
    #[error("Please upload an avatar.")]
    MissingAvatar,

    /// A required field is unset
    #[error("cannot issue a ticket without {0}")]
    Incomplete(FieldName),
}

/// An issued ticket
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    full_name: String,
    email: String,
    tier: PriceTier,
    quantity: TicketQuantity,
    avatar: AvatarHandle,
    barcode: BarcodeValue,
    issued_at: DateTime<Utc>,
}

impl Ticket {
    /// Attendee's name
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Attendee's email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Tier bought
    #[must_use]
    pub const fn tier(&self) -> PriceTier {
        self.tier
    }

    /// Number of tickets
    #[must_use]
    pub const fn quantity(&self) -> TicketQuantity {
        self.quantity
    }

    /// Avatar shown on the ticket
    #[must_use]
    pub const fn avatar(&self) -> &AvatarHandle {
        &self.avatar
    }

    /// Barcode identifier
    #[must_use]
    pub const fn barcode(&self) -> &BarcodeValue {
        &self.barcode
    }

    /// When the ticket was issued
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

/// Builds tickets from validated drafts
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketGenerator;

impl TicketGenerator {
    /// Issues a ticket
    ///
    /// `avatar` must be the live handle from this session; a restored
    /// placeholder is not enough.
    ///
    /// # Errors
    ///
    /// - [`TicketError::MissingAvatar`] without a live handle
    /// - [`TicketError::Incomplete`] if tier or quantity is unset
    pub fn generate(
        draft: &FormDraft,
        avatar: Option<&AvatarHandle>,
        barcodes: &dyn BarcodeSource,
        issued_at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let avatar = avatar.ok_or(TicketError::MissingAvatar)?;
        let tier = draft
            .ticket_price
            .ok_or(TicketError::Incomplete(FieldName::TicketPrice))?;
        let quantity = draft
            .ticket_quantity
            .ok_or(TicketError::Incomplete(FieldName::TicketQuantity))?;

        let barcode = barcodes.next_value();
        tracing::info!(%barcode, tier = %tier, quantity = quantity.get(), "Ticket issued");

        Ok(Ticket {
            full_name: draft.full_name.clone(),
            email: draft.email.clone(),
            tier,
            quantity,
            avatar: avatar.clone(),
            barcode,
            issued_at,
        })
    }
}
