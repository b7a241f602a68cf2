//! Domain models shared across CellWard services
//!
//! Cells are stored and transmitted with their authoritative occupant
//! count (`current_count`); the Occupancy Ledger layers its own running
//! display count on top of these records.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// Gender designation, used both for inmates and for cell type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(Error::InvalidInput(format!("Unknown gender: {}", other))),
        }
    }
}

/// Administrative status of a cell
///
/// Only `Active` cells are offered by availability queries; `Inactive`
/// and `Maintenance` cells keep their records and counts but accept no
/// new assignments through the normal flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CellStatus {
    Active,
    Inactive,
    Maintenance,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellStatus::Active => write!(f, "Active"),
            CellStatus::Inactive => write!(f, "Inactive"),
            CellStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

impl FromStr for CellStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(CellStatus::Active),
            "Inactive" => Ok(CellStatus::Inactive),
            "Maintenance" => Ok(CellStatus::Maintenance),
            other => Err(Error::InvalidInput(format!("Unknown cell status: {}", other))),
        }
    }
}

/// Custody status of an inmate
///
/// Only `Active` inmates count toward cell occupancy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InmateStatus {
    Active,
    Released,
    Transferred,
    Medical,
}

impl InmateStatus {
    /// Whether this status counts toward cell occupancy
    pub fn is_active(&self) -> bool {
        matches!(self, InmateStatus::Active)
    }
}

impl std::fmt::Display for InmateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InmateStatus::Active => write!(f, "Active"),
            InmateStatus::Released => write!(f, "Released"),
            InmateStatus::Transferred => write!(f, "Transferred"),
            InmateStatus::Medical => write!(f, "Medical"),
        }
    }
}

impl FromStr for InmateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(InmateStatus::Active),
            "Released" => Ok(InmateStatus::Released),
            "Transferred" => Ok(InmateStatus::Transferred),
            "Medical" => Ok(InmateStatus::Medical),
            other => Err(Error::InvalidInput(format!("Unknown inmate status: {}", other))),
        }
    }
}

/// A housing cell record as served by the roster API
///
/// `current_count` is the authoritative occupant count as computed by the
/// records store at serve time (Active inmates assigned to the cell).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: i64,
    pub name: String,
    pub capacity: u32,
    pub current_count: u32,
    #[serde(rename = "type")]
    pub cell_type: Gender,
    pub status: CellStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An inmate record, reduced to the fields occupancy accounting consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inmate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub status: InmateStatus,
    pub cell_id: Option<i64>,
}

impl Inmate {
    /// Full display name, surname last
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
