//! Discrete-event execution of an elaborated netlist.
//!
//! [`Simulation::new`] builds the runtime state for a [`Netlist`]: one
//! boolean slot per wire (initially false), one receiver list per channel,
//! and an [`Agenda`] of pending gate activations. Construction already
//! seeds the agenda: constant gates schedule their one-time drive, and a
//! gate watching a wire reacts once per watched input at registration
//! time, so outputs settle from the initial input state even when no
//! signal ever changes.
//!
//! [`Simulation::run`] drains the agenda. Firing a gate re-reads its
//! inputs at that moment rather than at scheduling time, then writes its
//! outputs; a wire write notifies watchers only when the stored value
//! actually changes. Channel sends are synchronous, so a probe's message
//! reaches every listener inside the probe's own activation. The run stops
//! when the agenda is empty or the configured step ceiling is reached,
//! summarized in a [`RunReport`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::agenda::{Agenda, Time};
use crate::netlist::{ChannelId, Gate, GateId, GateKind, Netlist, WireId};

/// Gate delays and the run budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub inverter_delay: Time,
    pub and_delay: Time,
    pub or_delay: Time,
    pub xor_delay: Time,
    pub bridge_delay: Time,
    pub probe_delay: Time,
    /// Upper bound on executed activations per run. Feedback loops
    /// oscillate forever without one.
    pub max_steps: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            inverter_delay: 2,
            and_delay: 3,
            or_delay: 5,
            xor_delay: 4,
            bridge_delay: 1,
            probe_delay: 1,
            max_steps: 1_000_000,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    /// The agenda drained completely.
    Completed,
    /// The step ceiling was hit with work still pending.
    Incomplete,
}

/// Summary of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Activations executed.
    pub steps: u64,
    /// Simulated time of the last executed activation.
    pub finished_at: Time,
    /// Final value of every wire, keyed by edge id.
    pub wires: IndexMap<String, bool>,
    /// Messages delivered to `LOG` gates, in delivery order.
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct WireState {
    value: bool,
    watchers: Vec<GateId>,
}

#[derive(Debug, Clone, Default)]
struct ChannelState {
    receivers: Vec<GateId>,
}

/// One simulation run over a borrowed netlist.
#[derive(Debug)]
pub struct Simulation<'a> {
    netlist: &'a Netlist,
    config: SimConfig,
    wires: Vec<WireState>,
    channels: Vec<ChannelState>,
    agenda: Agenda<GateId>,
    log: Vec<String>,
    steps: u64,
}

impl<'a> Simulation<'a> {
    pub fn new(netlist: &'a Netlist, config: SimConfig) -> Self {
        let mut sim = Simulation {
            netlist,
            config,
            wires: vec![WireState::default(); netlist.wires.len()],
            channels: vec![ChannelState::default(); netlist.channels.len()],
            agenda: Agenda::new(),
            log: Vec::new(),
            steps: 0,
        };
        for (index, gate) in netlist.gates.iter().enumerate() {
            sim.register(GateId(index), gate);
        }
        sim
    }

    fn register(&mut self, id: GateId, gate: &Gate) {
        match &gate.kind {
            GateKind::True | GateKind::False => {
                if !gate.wire_outs.is_empty() {
                    self.agenda.schedule(0, id);
                }
            }
            GateKind::Not
            | GateKind::And
            | GateKind::Or
            | GateKind::Xor
            | GateKind::Bridge
            | GateKind::Probe { .. } => {
                let delay = self.reaction_delay(&gate.kind);
                for wire in &gate.wire_ins {
                    self.wires[wire.0].watchers.push(id);
                    // Watching is eager: the reaction also runs once now.
                    self.agenda.schedule(delay, id);
                }
            }
            GateKind::Log => {
                for channel in &gate.chan_ins {
                    self.channels[channel.0].receivers.push(id);
                }
            }
            GateKind::Unknown { .. } => {}
        }
    }

    fn reaction_delay(&self, kind: &GateKind) -> Time {
        match kind {
            GateKind::Not => self.config.inverter_delay,
            GateKind::And => self.config.and_delay,
            GateKind::Or => self.config.or_delay,
            GateKind::Xor => self.config.xor_delay,
            GateKind::Bridge => self.config.bridge_delay,
            GateKind::Probe { .. } => self.config.probe_delay,
            GateKind::True | GateKind::False | GateKind::Log | GateKind::Unknown { .. } => 0,
        }
    }

    /// Executes activations in time order until the agenda drains or the
    /// step ceiling is reached.
    pub fn run(mut self) -> RunReport {
        let outcome = loop {
            if self.steps >= self.config.max_steps && !self.agenda.is_empty() {
                break RunOutcome::Incomplete;
            }
            match self.agenda.next() {
                Some(gate) => {
                    self.steps += 1;
                    self.fire(gate);
                }
                None => break RunOutcome::Completed,
            }
        };

        let wires = self
            .netlist
            .wires
            .iter()
            .zip(&self.wires)
            .map(|(edge, state)| (edge.as_str().to_string(), state.value))
            .collect();

        RunReport {
            outcome,
            steps: self.steps,
            finished_at: self.agenda.now(),
            wires,
            log: self.log,
        }
    }

    fn fire(&mut self, id: GateId) {
        let netlist = self.netlist;
        let gate = &netlist.gates[id.0];
        match &gate.kind {
            GateKind::True => self.write_output(gate, true),
            GateKind::False => self.write_output(gate, false),
            GateKind::Not => {
                let value = !self.read(gate.wire_ins.first());
                self.write_output(gate, value);
            }
            GateKind::And => {
                let value = self.read(gate.wire_ins.first()) && self.read(gate.wire_ins.get(1));
                self.write_output(gate, value);
            }
            GateKind::Or => {
                let value = self.read(gate.wire_ins.first()) || self.read(gate.wire_ins.get(1));
                self.write_output(gate, value);
            }
            GateKind::Xor => {
                let value = self.read(gate.wire_ins.first()) ^ self.read(gate.wire_ins.get(1));
                self.write_output(gate, value);
            }
            GateKind::Bridge => {
                for (input, output) in gate.wire_ins.iter().zip(&gate.wire_outs) {
                    let value = self.wires[input.0].value;
                    self.set_wire(*output, value);
                }
            }
            GateKind::Probe { name } => {
                let value = self.read(gate.wire_ins.first());
                let message = format!("{} @ {} = {}", name, self.agenda.now(), value);
                for channel in &gate.chan_outs {
                    self.send(*channel, &message);
                }
            }
            GateKind::Log | GateKind::Unknown { .. } => {}
        }
    }

    /// An unconnected input reads as false.
    fn read(&self, wire: Option<&WireId>) -> bool {
        match wire {
            Some(wire) => self.wires[wire.0].value,
            None => false,
        }
    }

    fn write_output(&mut self, gate: &Gate, value: bool) {
        if let Some(wire) = gate.wire_outs.first() {
            self.set_wire(*wire, value);
        }
    }

    /// Stores a wire value; watchers are notified only on an actual change.
    fn set_wire(&mut self, wire: WireId, value: bool) {
        if self.wires[wire.0].value == value {
            return;
        }
        self.wires[wire.0].value = value;
        for index in 0..self.wires[wire.0].watchers.len() {
            let watcher = self.wires[wire.0].watchers[index];
            let delay = self.reaction_delay(&self.netlist.gates[watcher.0].kind);
            self.agenda.schedule(delay, watcher);
        }
    }

    /// Broadcasts synchronously to every receiver, in registration order.
    fn send(&mut self, channel: ChannelId, message: &str) {
        for index in 0..self.channels[channel.0].receivers.len() {
            let receiver = self.channels[channel.0].receivers[index];
            if let GateKind::Log = self.netlist.gates[receiver.0].kind {
                self.log.push(message.to_string());
            }
        }
    }
}
