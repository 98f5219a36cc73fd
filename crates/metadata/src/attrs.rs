use std::fmt;
use std::str::FromStr;

/// A preservable metadata attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Attribute {
    /// Replication factor of the file.
    Replication,
    /// Block size of the file.
    BlockSize,
    /// Owning user.
    User,
    /// Owning group.
    Group,
    /// Permission bits.
    Permission,
    /// Checksum algorithm and bytes-per-unit.
    ChecksumType,
    /// Access control list entries.
    Acl,
    /// Extended attributes.
    Xattr,
    /// Modification and access times.
    Times,
}

impl Attribute {
    const ALL: [Self; 9] = [
        Self::Replication,
        Self::BlockSize,
        Self::User,
        Self::Group,
        Self::Permission,
        Self::ChecksumType,
        Self::Acl,
        Self::Xattr,
        Self::Times,
    ];

    /// The letter used in packed attribute strings.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Replication => 'r',
            Self::BlockSize => 'b',
            Self::User => 'u',
            Self::Group => 'g',
            Self::Permission => 'p',
            Self::ChecksumType => 'c',
            Self::Acl => 'a',
            Self::Xattr => 'x',
            Self::Times => 't',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        let lower = symbol.to_ascii_lowercase();
        Self::ALL.into_iter().find(|attr| attr.symbol() == lower)
    }

    const fn bit(self) -> u16 {
        match self {
            Self::Replication => 1 << 0,
            Self::BlockSize => 1 << 1,
            Self::User => 1 << 2,
            Self::Group => 1 << 3,
            Self::Permission => 1 << 4,
            Self::ChecksumType => 1 << 5,
            Self::Acl => 1 << 6,
            Self::Xattr => 1 << 7,
            Self::Times => 1 << 8,
        }
    }
}

/// A packed attribute string contained a letter no attribute maps to.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown preserve attribute letter '{0}' (expected a subset of \"rbugpcaxt\")")]
pub struct UnknownAttributeError(pub char);

/// The configured set of attributes to preserve on copied entries.
///
/// Decoded from the packed letter string accepted by the `preserveStatus`
/// option; letters are case-insensitive and order-insensitive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AttributeSet(u16);

impl AttributeSet {
    /// The empty set: every attribute is left at target defaults.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set containing every attribute.
    #[must_use]
    pub fn all() -> Self {
        let mut set = Self::empty();
        for attr in Attribute::ALL {
            set.insert(attr);
        }
        set
    }

    /// Adds `attr` to the set.
    pub fn insert(&mut self, attr: Attribute) {
        self.0 |= attr.bit();
    }

    /// Removes `attr` from the set.
    pub fn remove(&mut self, attr: Attribute) {
        self.0 &= !attr.bit();
    }

    /// Returns true when `attr` was explicitly selected.
    #[must_use]
    pub const fn contains(&self, attr: Attribute) -> bool {
        self.0 & attr.bit() != 0
    }

    /// Returns true when `attr` must be preserved.
    ///
    /// This is the effective check copy logic uses: selecting
    /// [`Attribute::ChecksumType`] also enforces block-size preservation,
    /// because the checksum scheme of a multi-block file is a function of its
    /// block size. The raw set is not rewritten, so packing round-trips.
    #[must_use]
    pub const fn preserves(&self, attr: Attribute) -> bool {
        match attr {
            Attribute::BlockSize => {
                self.contains(Attribute::BlockSize) || self.contains(Attribute::ChecksumType)
            }
            _ => self.contains(attr),
        }
    }

    /// Returns true when no attribute is selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the selected attributes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL.into_iter().filter(|attr| self.contains(*attr))
    }
}

impl FromStr for AttributeSet {
    type Err = UnknownAttributeError;

    fn from_str(packed: &str) -> Result<Self, Self::Err> {
        let mut set = Self::empty();
        for symbol in packed.chars() {
            let attr = Attribute::from_symbol(symbol).ok_or(UnknownAttributeError(symbol))?;
            set.insert(attr);
        }
        Ok(set)
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attr in self.iter() {
            write!(f, "{}", attr.symbol())?;
        }
        Ok(())
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = Self::empty();
        for attr in iter {
            set.insert(attr);
        }
        set
    }
}
