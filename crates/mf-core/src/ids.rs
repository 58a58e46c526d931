use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier used across the network graph.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        // index+1 must be nonzero
        Self(NonZeroU32::new(index + 1).expect("index+1 is nonzero"))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Declare a distinct, newtype-wrapped id backed by [`Id`].
///
/// Every entity kind in the network (node, channel, droplet, ...) gets its
/// own type so the compiler rejects mixing, say, a `NodeId` where a
/// `ChannelId` is expected, while staying as cheap as the bare `Id`.
macro_rules! domain_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Id);

        impl $name {
            /// Create from a 0-based index.
            pub fn from_index(index: u32) -> Self {
                Self(Id::from_index(index))
            }

            /// Recover the 0-based index.
            pub fn index(self) -> u32 {
                self.0.index()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.index())
            }
        }
    };
}

domain_id!(
    /// Id of a [`Node`](https://docs.rs/mf-graph) in the network graph.
    NodeId
);
domain_id!(
    /// Id of a rectangular [`Channel`](https://docs.rs/mf-graph).
    ChannelId
);
domain_id!(
    /// Id of a pressure or flow-rate pump.
    PumpId
);
domain_id!(
    /// Id of a CFD module (hybrid regime only).
    ModuleId
);
domain_id!(
    /// Id of a connected-component group (one reference pressure per group).
    GroupId
);
domain_id!(
    /// Id of an immutable fluid definition.
    FluidId
);
domain_id!(
    /// Id of a chemical specie definition.
    SpecieId
);
domain_id!(
    /// Id of an immutable mixture record.
    MixtureId
);
domain_id!(
    /// Id of a droplet.
    DropletId
);
domain_id!(
    /// Id of a scheduled injection.
    InjectionId
);
domain_id!(
    /// Id of a hybrid CFD simulator handle.
    SimulatorId
);

/// A generic 0-based index generator attached to the owning container,
/// rather than a process-wide global counter (see Design Notes: "Global
/// mutable state").
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate the next id of kind `T`, given a constructor from index.
    pub fn next_id<T>(&mut self, from_index: impl FnOnce(u32) -> T) -> T {
        let id = from_index(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}
