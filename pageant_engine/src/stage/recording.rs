//! A headless [`Stage`] that records every call.
//!
//! Used by the integration tests and by the CLI replay. Knobs on the struct
//! stand in for the state a real game would report (open dialogue, fade
//! progress, ready gates, player answers).

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

use super::{CameraMode, EffectSpec, EventOutcome, Stage};

/// One recorded collaborator call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, variantly::Variantly)]
pub enum StageCall {
    PushDialogue { speaker: Option<String>, text: String },
    AskQuestion { question: String, answers: Vec<String> },
    CloseMenus,
    BeginFade { to_black: bool, speed: f32, continue_during_fade: bool },
    FlashScreen(f32),
    RequestReady(String),
    WaitingForPlayers(Option<String>),
    PlaySound(String),
    PlayMusic(Option<String>),
    Viewport(CameraMode),
    Effect(EffectSpec),
    Emote { actor: String, emote: i32 },
    AddFlag(String),
    Friendship { npc: String, amount: i32 },
    AddItem { item: String, count: i32 },
    DeathPenalty(usize),
    ShowLostItems,
    AwardPrize(Option<String>),
    TriggerAction(String),
    EndEvent(EventOutcome),
}

/// Recording stage with scriptable responses.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    pub calls: Vec<StageCall>,
    pub local_player: u32,
    pub online: Vec<u32>,
    pub dialogue_open: bool,
    pub menu_open: bool,
    pub world_frozen: bool,
    pub fade_complete: bool,
    pub ready_gates: HashSet<String>,
    pub answers: VecDeque<usize>,
    pub flags: HashSet<String>,
    pub failing_actions: HashSet<String>,
    pub translations: HashMap<String, String>,
    pub state_dialogue: HashMap<(String, String), String>,
    pub items_to_lose: usize,
    pub festival_winner: bool,
    /// Close dialogue and menus at the start of every tick.
    pub auto_close: bool,
    /// Answer every question with this index.
    pub auto_answer: Option<usize>,
    /// Treat every ready gate as open.
    pub auto_ready: bool,
    pending_answer: Option<usize>,
}

impl Default for RecordingStage {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            local_player: 1,
            online: vec![1],
            dialogue_open: false,
            menu_open: false,
            world_frozen: false,
            fade_complete: true,
            ready_gates: HashSet::new(),
            answers: VecDeque::new(),
            flags: HashSet::new(),
            failing_actions: HashSet::new(),
            translations: HashMap::new(),
            state_dialogue: HashMap::new(),
            items_to_lose: 0,
            festival_winner: false,
            auto_close: false,
            auto_answer: None,
            auto_ready: false,
            pending_answer: None,
        }
    }
}

impl RecordingStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stage that keeps any script moving: dialogue closes every tick,
    /// questions get the first answer, fades finish, and gates open.
    pub fn autopilot() -> Self {
        Self {
            auto_close: true,
            auto_answer: Some(0),
            auto_ready: true,
            ..Self::default()
        }
    }

    /// Every dialogue line pushed so far, in order.
    pub fn dialogue(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                StageCall::PushDialogue { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&StageCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    /// Queue the answer a player will pick for the next question.
    pub fn answer_with(&mut self, index: usize) {
        self.answers.push_back(index);
    }
}

impl Stage for RecordingStage {
    fn local_player_number(&self) -> u32 {
        self.local_player
    }

    fn online_players(&self) -> Vec<u32> {
        self.online.clone()
    }

    fn is_dialogue_open(&self) -> bool {
        self.dialogue_open
    }

    fn is_any_modal_menu_open(&self) -> bool {
        self.menu_open || self.dialogue_open
    }

    fn push_dialogue(&mut self, speaker: Option<&str>, text: &str) {
        self.dialogue_open = true;
        self.calls.push(StageCall::PushDialogue {
            speaker: speaker.map(str::to_string),
            text: text.to_string(),
        });
    }

    fn ask_question(&mut self, question: &str, answers: &[String]) {
        self.dialogue_open = true;
        self.pending_answer = self.answers.pop_front().or(self.auto_answer);
        self.calls.push(StageCall::AskQuestion {
            question: question.to_string(),
            answers: answers.to_vec(),
        });
    }

    fn take_answer(&mut self) -> Option<usize> {
        let answer = self.pending_answer.take();
        if answer.is_some() {
            self.dialogue_open = false;
        }
        answer
    }

    fn close_dialogue_and_menus(&mut self) {
        self.dialogue_open = false;
        self.menu_open = false;
        self.calls.push(StageCall::CloseMenus);
    }

    fn is_world_frozen(&self) -> bool {
        self.world_frozen
    }

    fn begin_screen_fade(&mut self, to_black: bool, speed: f32, continue_during_fade: bool) {
        self.calls.push(StageCall::BeginFade {
            to_black,
            speed,
            continue_during_fade,
        });
    }

    fn is_fade_complete(&self) -> bool {
        self.fade_complete
    }

    fn flash_screen(&mut self, alpha: f32) {
        self.calls.push(StageCall::FlashScreen(alpha));
    }

    fn request_local_ready(&mut self, gate: &str) {
        self.calls.push(StageCall::RequestReady(gate.to_string()));
    }

    fn is_gate_ready(&self, gate: &str) -> bool {
        self.auto_ready || self.ready_gates.contains(gate)
    }

    fn set_waiting_for_players(&mut self, gate: Option<&str>) {
        self.calls
            .push(StageCall::WaitingForPlayers(gate.map(str::to_string)));
    }

    fn play_sound(&mut self, id: &str) {
        self.calls.push(StageCall::PlaySound(id.to_string()));
    }

    fn play_music(&mut self, id: Option<&str>) {
        self.calls.push(StageCall::PlayMusic(id.map(str::to_string)));
    }

    fn set_viewport(&mut self, camera: CameraMode) {
        self.calls.push(StageCall::Viewport(camera));
    }

    fn spawn_transient_effect(&mut self, spec: EffectSpec) {
        self.calls.push(StageCall::Effect(spec));
    }

    fn show_emote(&mut self, actor: &str, emote: i32) {
        self.calls.push(StageCall::Emote {
            actor: actor.to_string(),
            emote,
        });
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn add_flag(&mut self, flag: &str) {
        self.flags.insert(flag.to_string());
        self.calls.push(StageCall::AddFlag(flag.to_string()));
    }

    fn change_friendship(&mut self, npc: &str, amount: i32) {
        self.calls.push(StageCall::Friendship {
            npc: npc.to_string(),
            amount,
        });
    }

    fn add_item(&mut self, item: &str, count: i32) {
        self.calls.push(StageCall::AddItem {
            item: item.to_string(),
            count,
        });
    }

    fn translate(&self, key: &str) -> Option<String> {
        self.translations.get(key).cloned()
    }

    fn dialogue_for_state(&self, actor: &str, key: &str) -> Option<String> {
        self.state_dialogue
            .get(&(actor.to_string(), key.to_string()))
            .cloned()
    }

    fn apply_death_penalty(&mut self) -> usize {
        let lost = self.items_to_lose;
        self.calls.push(StageCall::DeathPenalty(lost));
        lost
    }

    fn show_lost_items(&mut self) {
        self.menu_open = true;
        self.calls.push(StageCall::ShowLostItems);
    }

    fn is_festival_winner(&self) -> bool {
        self.festival_winner
    }

    fn award_festival_prize(&mut self, prize: Option<&str>) {
        self.calls.push(StageCall::AwardPrize(prize.map(str::to_string)));
    }

    fn run_trigger_action(&mut self, action: &str) -> Result<()> {
        self.calls.push(StageCall::TriggerAction(action.to_string()));
        if self.failing_actions.contains(action) {
            bail!("trigger action '{action}' failed");
        }
        Ok(())
    }

    fn end_event(&mut self, outcome: &EventOutcome) {
        info!("event ended: {outcome:?}");
        self.calls.push(StageCall::EndEvent(outcome.clone()));
    }

    fn on_tick(&mut self, _elapsed_ms: f32) {
        if self.auto_close && (self.dialogue_open || self.menu_open) {
            self.dialogue_open = false;
            self.menu_open = false;
        }
    }
}
