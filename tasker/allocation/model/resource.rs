use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of resource a task requires or a system provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// No specific resource.
    #[default]
    None,
    /// Sensor system.
    Sensor,
    /// Weapon system.
    Weapon,
    /// Jammer system.
    Jammer,
    /// Processor.
    Processor,
    /// Data uplink.
    Uplink,
}

impl ResourceKind {
    /// Stable numeric code used when deriving task ids.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Sensor => 1,
            Self::Weapon => 2,
            Self::Jammer => 3,
            Self::Processor => 4,
            Self::Uplink => 5,
        }
    }

    /// Default task type label for generated tasks of this kind.
    #[must_use]
    pub const fn task_type(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Sensor => "TRACK",
            Self::Weapon => "WEAPON",
            Self::Jammer => "JAM",
            Self::Processor => "PROCESS",
            Self::Uplink => "UPLINK",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Sensor => "sensor",
            Self::Weapon => "weapon",
            Self::Jammer => "jammer",
            Self::Processor => "processor",
            Self::Uplink => "uplink",
        };
        f.write_str(label)
    }
}

/// Kind-specific parameters of a task resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum ResourceDetail {
    /// No extra parameters; acts as a wildcard when matching.
    #[default]
    None,
    /// Weapon parameters.
    Weapon {
        /// Number of shots requested.
        shots: u32,
    },
    /// Jammer parameters.
    Jammer {
        /// Centre frequency in Hz (zero means any).
        frequency: f64,
        /// Bandwidth in Hz (zero means any).
        bandwidth: f64,
        /// Beam number (zero means any).
        beam: u32,
    },
    /// Sensor parameters.
    Sensor {
        /// Requested mode name (empty means any).
        mode: String,
    },
    /// Uplink parameters.
    Uplink {
        /// Update delay in seconds.
        delay: f64,
        /// Source system name.
        source: Option<String>,
        /// Destination platform name.
        destination: Option<String>,
    },
}

/// Resource descriptor carried by every task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResource {
    /// Resource kind.
    pub kind: ResourceKind,
    /// System name; empty until filled from the assignee's matching system.
    #[serde(default)]
    pub name: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub detail: ResourceDetail,
}

impl TaskResource {
    /// Creates a descriptor of the given kind with no parameters.
    #[must_use]
    pub const fn of(kind: ResourceKind) -> Self {
        Self {
            kind,
            name: String::new(),
            detail: ResourceDetail::None,
        }
    }

    /// Weapon descriptor requesting `shots`.
    #[must_use]
    pub const fn weapon(shots: u32) -> Self {
        Self {
            kind: ResourceKind::Weapon,
            name: String::new(),
            detail: ResourceDetail::Weapon { shots },
        }
    }

    /// Jammer descriptor.
    #[must_use]
    pub const fn jammer(frequency: f64, bandwidth: f64) -> Self {
        Self {
            kind: ResourceKind::Jammer,
            name: String::new(),
            detail: ResourceDetail::Jammer {
                frequency,
                bandwidth,
                beam: 0,
            },
        }
    }

    /// Sensor descriptor requesting `mode`.
    #[must_use]
    pub fn sensor(mode: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Sensor,
            name: String::new(),
            detail: ResourceDetail::Sensor { mode: mode.into() },
        }
    }

    /// Sets the system name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of weapon shots requested, when this is a weapon descriptor.
    #[must_use]
    pub const fn shots(&self) -> Option<u32> {
        match self.detail {
            ResourceDetail::Weapon { shots } => Some(shots),
            _ => None,
        }
    }

    /// Whether this descriptor can be served by `other`.
    ///
    /// Kinds must be equal. Empty names and absent details are wildcards; kind-specific
    /// fields are only compared when both sides set them.
    #[must_use]
    pub fn is_match(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if !self.name.is_empty() && !other.name.is_empty() && self.name != other.name {
            return false;
        }
        match (&self.detail, &other.detail) {
            (ResourceDetail::None, _) | (_, ResourceDetail::None) => true,
            (
                ResourceDetail::Jammer {
                    frequency: f1,
                    bandwidth: b1,
                    beam: beam1,
                },
                ResourceDetail::Jammer {
                    frequency: f2,
                    bandwidth: b2,
                    beam: beam2,
                },
            ) => {
                field_agrees(*f1, *f2) && field_agrees(*b1, *b2) && (*beam1 == 0 || *beam2 == 0 || beam1 == beam2)
            }
            (ResourceDetail::Sensor { mode: m1 }, ResourceDetail::Sensor { mode: m2 }) => {
                m1.is_empty() || m2.is_empty() || m1 == m2
            }
            (ResourceDetail::Weapon { .. }, ResourceDetail::Weapon { .. }) => true,
            (
                ResourceDetail::Uplink {
                    source: s1,
                    destination: d1,
                    ..
                },
                ResourceDetail::Uplink {
                    source: s2,
                    destination: d2,
                    ..
                },
            ) => optional_agrees(s1.as_ref(), s2.as_ref()) && optional_agrees(d1.as_ref(), d2.as_ref()),
            // Same kind with mismatched detail variants only arises from hand-built descriptors.
            _ => false,
        }
    }
}

#[allow(clippy::float_cmp)]
fn field_agrees(a: f64, b: f64) -> bool {
    a == 0.0 || b == 0.0 || a == b
}

fn optional_agrees(a: Option<&String>, b: Option<&String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jammer_never_matches_other_kind() {
        let jammer = TaskResource::jammer(0.0, 0.0).named("ecm");
        let sensor = TaskResource::of(ResourceKind::Sensor).named("ecm");
        assert!(!jammer.is_match(&sensor));
        assert!(!sensor.is_match(&jammer));
    }

    #[test]
    fn jammer_frequency_must_agree_when_both_set() {
        let wanted = TaskResource::jammer(9.0e9, 1.0e6);
        assert!(wanted.is_match(&TaskResource::jammer(9.0e9, 0.0)));
        assert!(!wanted.is_match(&TaskResource::jammer(3.0e9, 1.0e6)));
        assert!(wanted.is_match(&TaskResource::of(ResourceKind::Jammer)));
    }

    #[test]
    fn names_act_as_wildcards_when_empty() {
        let wanted = TaskResource::sensor("stt");
        assert!(wanted.is_match(&TaskResource::sensor("stt").named("radar")));
        assert!(!wanted.clone().named("eo").is_match(&TaskResource::sensor("").named("radar")));
        assert!(!wanted.is_match(&TaskResource::sensor("tws")));
    }
}
