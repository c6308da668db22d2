use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The full set of actions a transaction can represent on the social graph
/// plus the economic types (`TRANSFER`, `STAKE`, `ICO`) and tipping.
///
/// Wire-encoded as the plain integer `transaction_type` field, matching the
/// original service's enum ordinals exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Post,
    EditPost,
    DeletePost,
    Comment,
    EditComment,
    DeleteComment,
    Reply,
    EditReply,
    DeleteReply,
    Share,
    ReactLike,
    Report,
    Tip,
    Follow,
    Unfollow,
    Transfer,
    Stake,
    Ico,
}

impl TransactionType {
    pub fn as_u8(self) -> u8 {
        match self {
            TransactionType::Post => 1,
            TransactionType::EditPost => 2,
            TransactionType::DeletePost => 3,
            TransactionType::Comment => 4,
            TransactionType::EditComment => 5,
            TransactionType::DeleteComment => 6,
            TransactionType::Reply => 7,
            TransactionType::EditReply => 8,
            TransactionType::DeleteReply => 9,
            TransactionType::Share => 10,
            TransactionType::ReactLike => 11,
            TransactionType::Report => 12,
            TransactionType::Tip => 13,
            TransactionType::Follow => 14,
            TransactionType::Unfollow => 15,
            TransactionType::Transfer => 16,
            TransactionType::Stake => 17,
            TransactionType::Ico => 18,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => TransactionType::Post,
            2 => TransactionType::EditPost,
            3 => TransactionType::DeletePost,
            4 => TransactionType::Comment,
            5 => TransactionType::EditComment,
            6 => TransactionType::DeleteComment,
            7 => TransactionType::Reply,
            8 => TransactionType::EditReply,
            9 => TransactionType::DeleteReply,
            10 => TransactionType::Share,
            11 => TransactionType::ReactLike,
            12 => TransactionType::Report,
            13 => TransactionType::Tip,
            14 => TransactionType::Follow,
            15 => TransactionType::Unfollow,
            16 => TransactionType::Transfer,
            17 => TransactionType::Stake,
            18 => TransactionType::Ico,
            _ => return None,
        })
    }

    /// Social types have no effect on account state beyond the (optional) fee.
    pub fn is_social(self) -> bool {
        !matches!(
            self,
            TransactionType::Stake | TransactionType::Transfer | TransactionType::Tip | TransactionType::Ico
        )
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        TransactionType::from_u8(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown transaction_type {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionContentType {
    PlainString,
    Html,
}

impl TransactionContentType {
    pub fn as_u8(self) -> u8 {
        match self {
            TransactionContentType::PlainString => 1,
            TransactionContentType::Html => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => TransactionContentType::PlainString,
            2 => TransactionContentType::Html,
            _ => return None,
        })
    }
}

impl Serialize for TransactionContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for TransactionContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        TransactionContentType::from_u8(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown content_type {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for raw in 1..=18u8 {
            let ty = TransactionType::from_u8(raw).unwrap();
            assert_eq!(ty.as_u8(), raw);
        }
        assert!(TransactionType::from_u8(0).is_none());
        assert!(TransactionType::from_u8(19).is_none());
    }

    #[test]
    fn social_classification() {
        assert!(TransactionType::Post.is_social());
        assert!(!TransactionType::Stake.is_social());
        assert!(!TransactionType::Transfer.is_social());
        assert!(!TransactionType::Tip.is_social());
        assert!(!TransactionType::Ico.is_social());
    }
}
