/// Lifecycle of an offline gateway generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  /// Created, nothing attempted yet
  Parsed,
  /// Seeding the current store
  Installing,
  /// Seed complete; waiting is skipped so activation follows at once
  Installed,
  /// Purging stale stores
  Activating,
  /// Controlling all requests
  Activated,
  /// Install failed; this generation never takes control
  Redundant,
}

impl LifecycleState {
  /// Whether requests are routed through the gateway in this state.
  pub fn is_controlling(self) -> bool {
    self == LifecycleState::Activated
  }

  /// Whether registration has reached a final outcome.
  pub fn is_settled(self) -> bool {
    matches!(self, LifecycleState::Activated | LifecycleState::Redundant)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      LifecycleState::Parsed => "parsed",
      LifecycleState::Installing => "installing",
      LifecycleState::Installed => "installed",
      LifecycleState::Activating => "activating",
      LifecycleState::Activated => "activated",
      LifecycleState::Redundant => "redundant",
    }
  }
}

impl std::fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
