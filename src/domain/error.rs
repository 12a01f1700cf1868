use std::fmt;

/// Why an intent was turned away. Logged server-side, never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotHolder,
    StaleHolder,
    NotHeld,
    AlreadyHeld,
    Inactive,
    NotCandidate,
    CannotShoot,
    EmptyMagazine,
    NotShooting,
    AlreadyFired,
    Shooting,
    AlreadyReloading,
    MagazineFull,
    NoReserve,
    NotReloading,
    Faulted,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NotHolder => "requester does not hold the weapon",
            Rejection::StaleHolder => "holder is no longer in the world",
            Rejection::NotHeld => "weapon is not held",
            Rejection::AlreadyHeld => "weapon is already held",
            Rejection::Inactive => "weapon interaction is disabled",
            Rejection::NotCandidate => "requester has no pickup right",
            Rejection::CannotShoot => "weapon cannot shoot now",
            Rejection::EmptyMagazine => "magazine is empty",
            Rejection::NotShooting => "weapon is not shooting",
            Rejection::AlreadyFired => "this shot was already fired",
            Rejection::Shooting => "weapon is mid-shot",
            Rejection::AlreadyReloading => "weapon is already reloading",
            Rejection::MagazineFull => "magazine is full",
            Rejection::NoReserve => "no reserve ammunition",
            Rejection::NotReloading => "weapon is not reloading",
            Rejection::Faulted => "weapon is faulted",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that take a weapon instance out of service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeaponError {
    MissingConfig(u32),
    InvalidConfig(&'static str),
    Faulted(&'static str),
    TooManyWeapons(usize),
}

impl fmt::Display for WeaponError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaponError::MissingConfig(kind) => write!(f, "no weapon definition for kind {}", kind),
            WeaponError::InvalidConfig(reason) => write!(f, "invalid weapon definition: {}", reason),
            WeaponError::Faulted(reason) => write!(f, "weapon faulted: {}", reason),
            WeaponError::TooManyWeapons(limit) => write!(f, "weapon limit of {} reached", limit),
        }
    }
}

impl std::error::Error for WeaponError {}
