use super::{Component, ComponentState, StationOrchestrator};
use tracing::debug;

impl StationOrchestrator {
    /// Mark every component stopped before startup begins
    pub(super) async fn reset_component_states(&self) {
        let mut states = self.component_states.lock().await;
        for component in Component::ALL {
            states.insert(component, ComponentState::Stopped);
        }
    }

    /// Record a lifecycle transition; repeats of the current state are not logged
    pub async fn set_component_state(&self, component: Component, state: ComponentState) {
        let previous = self.component_states.lock().await.insert(component, state);
        if previous != Some(state) {
            debug!(%component, ?previous, ?state, "Component state changed");
        }
    }

    pub async fn component_state(&self, component: Component) -> Option<ComponentState> {
        self.component_states.lock().await.get(&component).copied()
    }

    /// Known states in startup order
    pub async fn component_states(&self) -> Vec<(Component, ComponentState)> {
        let states = self.component_states.lock().await;
        Component::ALL
            .into_iter()
            .filter_map(|component| states.get(&component).map(|state| (component, *state)))
            .collect()
    }
}
