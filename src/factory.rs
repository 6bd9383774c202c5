use anyhow::bail;
use serde::{Deserialize, Serialize};

use catan_builtin_negotiators::{
    OnlyOwnBuildPlan, PersuaderAhead, PersuaderBuilds, PersuaderLeads, PersuaderMinVp, Skeptic,
};
use catan_negotiator_component::static_lib::create_static_gate;
use catan_negotiator_component::{
    BoardOracle, BuildPlanner, GameSnapshot, GateFactory, GatesPack, NegotiationPolicy,
    SkepticismGate,
};
use catan_trade_model::PlayerId;

use crate::agent::{AgentAddr, AgentCallbacks, NegotiatorAgent};
use crate::coordinator::Coordinator;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    pub name: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    pub player: PlayerId,
    #[serde(default)]
    pub policy: NegotiationPolicy,
    /// Consulted in this order.
    #[serde(default)]
    pub gates: Vec<GateConfig>,
}

pub fn create_gates(configs: Vec<GateConfig>) -> anyhow::Result<GatesPack> {
    let mut gates = GatesPack::new();
    for config in configs.into_iter() {
        let name = config.name;
        let gate = if name.contains("::") {
            create_static_gate(&name, config.params)?
        } else {
            create_builtin(&name, config.params)?
        };
        gates = gates.add_gate(&name, gate);
    }
    Ok(gates)
}

pub fn create_builtin(
    name: &str,
    params: serde_yaml::Value,
) -> anyhow::Result<Box<dyn SkepticismGate>> {
    let gate = match &name[..] {
        "PersuaderMinVp" => Box::new(PersuaderMinVp::new(name, params)?) as Box<dyn SkepticismGate>,
        "Skeptic" => Box::new(Skeptic::new(name, params)?) as Box<dyn SkepticismGate>,
        "OnlyOwnBuildPlan" => {
            Box::new(OnlyOwnBuildPlan::new(name, params)?) as Box<dyn SkepticismGate>
        }
        "PersuaderAhead" => Box::new(PersuaderAhead::new(name, params)?) as Box<dyn SkepticismGate>,
        "PersuaderLeads" => Box::new(PersuaderLeads::new(name, params)?) as Box<dyn SkepticismGate>,
        "PersuaderBuilds" => {
            Box::new(PersuaderBuilds::new(name, params)?) as Box<dyn SkepticismGate>
        }
        _ => bail!("BuiltIn gate {} doesn't exists.", &name),
    };
    Ok(gate)
}

pub fn create_coordinator(config: AgentConfig) -> anyhow::Result<Coordinator> {
    config.policy.validate()?;
    let gates = create_gates(config.gates)?;
    Ok(Coordinator::new(config.player, config.policy, gates))
}

/// Starts an agent actor. Must be called from within an actix system.
pub fn create_agent(
    config: AgentConfig,
    game: GameSnapshot,
    planner: Box<dyn BuildPlanner>,
    board: Box<dyn BoardOracle>,
) -> anyhow::Result<(AgentAddr, AgentCallbacks)> {
    game.validate()?;
    if config.player >= game.players.len() {
        bail!(
            "Player {} doesn't take part in game [{}].",
            config.player,
            game.name
        );
    }

    let coordinator = create_coordinator(config)?;
    let (agent, callbacks) = NegotiatorAgent::new(coordinator, game, planner, board);
    Ok((AgentAddr::from(agent), callbacks))
}
