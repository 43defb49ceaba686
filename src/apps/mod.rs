pub mod assistant;
pub mod travel;

use crate::agent::Agent;

/// A runnable example: the root agent plus what the runner shows on start-up.
pub struct App {
    pub name: &'static str,
    pub banner: &'static str,
    pub sample_prompts: &'static [&'static str],
    pub agent: Agent,
}

impl App {
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("agent", &self.agent.name())
            .field("tools", &self.agent.tool_names().collect::<Vec<_>>())
            .finish()
    }
}
