use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global string interner shared by element and task ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Process-wide sequence appended to generated ids so two ids minted
/// within the same millisecond stay distinct.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn generate(prefix: &str) -> Spur {
    let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    INTERNER.get_or_intern(format!("{prefix}-{}-{n}", now_millis()))
}

/// Identifier of a placed canvas element.
/// Interned: 4 bytes, `Copy`, O(1) `Eq`/`Hash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern an existing id string (e.g. one loaded from a project).
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a fresh id such as `text-1718000000000-3`.
    pub fn generate(prefix: &str) -> Self {
        ElementId(generate(prefix))
    }
}

/// Identifier of a queued generation task.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Spur);

impl TaskId {
    pub fn intern(s: &str) -> Self {
        TaskId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    pub fn generate() -> Self {
        TaskId(generate("task"))
    }
}

macro_rules! impl_id_traits {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($ty::intern(&s))
            }
        }
    };
}

impl_id_traits!(ElementId);
impl_id_traits!(TaskId);
