use std::str::FromStr;

use thiserror::Error;

use crate::models::{
    types::UtcDateTime, LeagueId, NotificationId, NotificationKind, Phase, RoundId, SubmissionId,
    SubmissionType, UserId,
};

pub trait DBConvertible: Sized {
    type DBType;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError>;

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError>;
}

#[derive(Debug, Error)]
pub enum DBFromConversionError {
    #[error("Invalid timestamp: {0}")]
    DateTime(#[from] time::error::ComponentRange),
    #[error("Failed to parse enum variant: {0}")]
    NoSuchVariant(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(i64),
}

#[derive(Debug, Error)]
pub enum DBToConversionError {
    #[error("Number does not fit into the column: {0}")]
    InvalidNumber(u64),
}

impl DBConvertible for UtcDateTime {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.unix_timestamp())
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(UtcDateTime::from_unix_timestamp(*value)?)
    }
}

impl DBConvertible for u64 {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        i64::try_from(*self).map_err(|_| DBToConversionError::InvalidNumber(*self))
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        u64::try_from(*value).map_err(|_| DBFromConversionError::InvalidNumber(*value))
    }
}

impl DBConvertible for u32 {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(*self as _)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        u32::try_from(*value).map_err(|_| DBFromConversionError::InvalidNumber(*value))
    }
}

impl DBConvertible for u8 {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(*self as _)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        u8::try_from(*value).map_err(|_| DBFromConversionError::InvalidNumber(*value))
    }
}

macro_rules! id_conversion {
    ($($id:ident),+ $(,)?) => {
        $(
            impl DBConvertible for $id {
                type DBType = i64;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    self.0.to_db()
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    Ok($id(u64::from_db(value)?))
                }
            }
        )+
    };
}

id_conversion!(LeagueId, RoundId, SubmissionId, UserId, NotificationId);

macro_rules! enum_conversion {
    ($($enum:ident),+ $(,)?) => {
        $(
            impl DBConvertible for $enum {
                type DBType = String;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    Ok(self.as_ref().to_string())
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    $enum::from_str(value)
                        .map_err(|_| DBFromConversionError::NoSuchVariant(value.to_string()))
                }
            }
        )+
    };
}

enum_conversion!(Phase, SubmissionType, NotificationKind);

impl<T: DBConvertible> DBConvertible for Option<T> {
    type DBType = Option<T::DBType>;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        self.as_ref().map(T::to_db).transpose()
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        value.as_ref().map(T::from_db).transpose()
    }
}
