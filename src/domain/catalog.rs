use super::identity::{Role, UserId};
use super::money::Price;
use crate::error::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use entity_id;

entity_id!(VehicleId);
entity_id!(ServiceId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bike,
}

impl FromStr for VehicleType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "car" => Ok(VehicleType::Car),
            "bike" => Ok(VehicleType::Bike),
            other => Err(BookingError::ValidationFailed(format!(
                "unknown vehicle type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VehicleType::Car => "car",
            VehicleType::Bike => "bike",
        })
    }
}

/// Identity record. The credential hash lives with the identity subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub user_id: UserId,
    pub name: String,
    pub numberplate: String,
    pub vehicle_type: VehicleType,
}

impl Vehicle {
    pub fn new(
        owner: UserId,
        name: impl Into<String>,
        numberplate: impl Into<String>,
        vehicle_type: VehicleType,
    ) -> Self {
        Self {
            id: VehicleId::new(),
            user_id: owner,
            name: name.into(),
            numberplate: numberplate.into(),
            vehicle_type,
        }
    }

    pub fn summary(&self) -> VehicleSummary {
        VehicleSummary {
            id: self.id,
            name: self.name.clone(),
            numberplate: self.numberplate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub price: Price,
    /// Minutes, always positive.
    pub duration: u32,
    pub vehicle_type: VehicleType,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        price: Price,
        duration: u32,
        vehicle_type: VehicleType,
    ) -> Result<Self> {
        if duration == 0 {
            return Err(BookingError::ValidationFailed(
                "Service duration must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: ServiceId::new(),
            name: name.into(),
            price,
            duration,
            vehicle_type,
        })
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub name: String,
    pub numberplate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub name: String,
    pub price: Price,
}
