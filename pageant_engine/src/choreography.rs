//! Festival dance choreography.
//!
//! The main-event script is written once against generic `Leader{i}` and
//! `Follower{i}` slots. [`pair_dancers`] decides who dances with whom, and
//! [`assemble`] writes the chosen dancers into the template:
//!
//! - placeholders become `farmerN` tokens or villager names
//! - commands naming an empty slot are dropped, as are empty slots' groups in
//!   the actor layout and in a shared `move`
//! - `warp` targets are spread evenly across each row's original width
//! - generic ready/idle frames are rewritten for player dancers

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use pageant_data::DanceRosterDef;
use pageant_script::split_command;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Script, ScriptStore};

/// Index of the actor layout in an event header.
const LAYOUT_INDEX: usize = 2;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\b(Leader|Follower)(\d+)\b").expect("placeholder regex must compile");

    /// Frame fixes for player dancers. A `/` in the replacement splits it
    /// into separate commands.
    static ref FRAME_RULES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"^showFrame (farmer\d+) 44$").expect("frame rule must compile"),
            "showFrame ${1} 12/faceDirection ${1} 0",
        ),
        (
            Regex::new(r"^showFrame (farmer\d+) 40$").expect("frame rule must compile"),
            "showFrame ${1} 0/faceDirection ${1} 2",
        ),
        (
            Regex::new(r"^animate (farmer\d+) (\w+) (\w+) (\d+) 44 45$").expect("frame rule must compile"),
            "animate ${1} ${2} ${3} ${4} 12 13",
        ),
    ];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChoreographyError {
    #[error("{pairs} bound pair(s) do not fit the {slots} slot(s) in the dance template")]
    TooManyPairs { pairs: usize, slots: usize },
    #[error("script '{0}' has no Leader/Follower slots")]
    MissingTemplate(String),
    #[error("no dance roster is loaded")]
    MissingRoster,
}

/// A festival participant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dancer {
    Player(u32),
    Villager(String),
}

impl Dancer {
    pub fn player_number(&self) -> Option<u32> {
        match self {
            Dancer::Player(number) => Some(*number),
            Dancer::Villager(_) => None,
        }
    }

    /// The actor token used in scripts.
    pub fn token(&self) -> String {
        match self {
            Dancer::Player(number) => format!("farmer{number}"),
            Dancer::Villager(name) => name.clone(),
        }
    }
}

impl fmt::Display for Dancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DanceRole {
    Leader,
    Follower,
}

/// "`dancer` dances as `role` with `partner`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanceBinding {
    pub dancer: Dancer,
    pub role: DanceRole,
    pub partner: Dancer,
}

impl DanceBinding {
    pub fn to_pair(&self) -> DancePair {
        match self.role {
            DanceRole::Leader => DancePair {
                leader: self.dancer.clone(),
                follower: self.partner.clone(),
            },
            DanceRole::Follower => DancePair {
                leader: self.partner.clone(),
                follower: self.dancer.clone(),
            },
        }
    }
}

/// Who is online and who has asked whom to dance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanceInput {
    pub online_players: Vec<u32>,
    #[serde(default)]
    pub bindings: Vec<DanceBinding>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DancePair {
    pub leader: Dancer,
    pub follower: Dancer,
}

impl DancePair {
    pub fn involves_player(&self) -> bool {
        self.leader.player_number().is_some() || self.follower.player_number().is_some()
    }

    /// Lowest player number in the pair; villager-only pairs sort last.
    fn sort_key(&self) -> u32 {
        [&self.leader, &self.follower]
            .iter()
            .filter_map(|d| d.player_number())
            .min()
            .unwrap_or(u32::MAX)
    }

    fn same_dancers(&self, other: &DancePair) -> bool {
        (self.leader == other.leader && self.follower == other.follower)
            || (self.leader == other.follower && self.follower == other.leader)
    }
}

impl fmt::Display for DancePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} & {}", self.leader, self.follower)
    }
}

/// Choose the dance pairs for `slots` slots, in stage order.
///
/// Bound pairs come first (player pairs by lowest player number, then
/// villager-only pairs), then roster villagers who are not already dancing.
/// The final list is arranged from the middle outward.
pub fn pair_dancers(
    input: &DanceInput,
    roster: &DanceRosterDef,
    slots: usize,
) -> Result<Vec<DancePair>, ChoreographyError> {
    let online: HashSet<u32> = input.online_players.iter().copied().collect();
    let present = |d: &Dancer| d.player_number().is_none_or(|n| online.contains(&n));

    let mut used: HashSet<Dancer> = HashSet::new();
    let mut bound: Vec<DancePair> = Vec::new();
    for binding in &input.bindings {
        if !present(&binding.dancer) || !present(&binding.partner) {
            debug!("dropping binding {} -> {}: player offline", binding.dancer, binding.partner);
            continue;
        }
        let pair = binding.to_pair();
        if pair.leader == pair.follower {
            warn!("{} is bound to themselves; ignoring", pair.leader);
            continue;
        }
        if bound.iter().any(|p| p.same_dancers(&pair)) {
            debug!("collapsing reciprocal binding {pair}");
            continue;
        }
        if used.contains(&pair.leader) || used.contains(&pair.follower) {
            warn!("binding {pair} conflicts with an earlier partner choice; ignoring");
            continue;
        }
        used.insert(pair.leader.clone());
        used.insert(pair.follower.clone());
        bound.push(pair);
    }

    let (mut ordered, villagers_only): (Vec<_>, Vec<_>) = bound.into_iter().partition(DancePair::involves_player);
    ordered.sort_by_key(DancePair::sort_key);
    ordered.extend(villagers_only);
    if ordered.len() > slots {
        return Err(ChoreographyError::TooManyPairs {
            pairs: ordered.len(),
            slots,
        });
    }

    let leaders = roster
        .leaders()
        .map(|name| Dancer::Villager(name.to_string()))
        .filter(|d| !used.contains(d));
    let followers = roster
        .followers()
        .map(|name| Dancer::Villager(name.to_string()))
        .filter(|d| !used.contains(d));
    let open = slots - ordered.len();
    ordered.extend(
        leaders
            .zip(followers)
            .take(open)
            .map(|(leader, follower)| DancePair { leader, follower }),
    );
    if ordered.len() < slots {
        warn!("only {} of {slots} dance slot(s) could be filled", ordered.len());
    }

    let mut arranged = VecDeque::with_capacity(ordered.len());
    for (i, pair) in ordered.into_iter().enumerate() {
        if i % 2 == 0 {
            arranged.push_front(pair);
        } else {
            arranged.push_back(pair);
        }
    }
    Ok(Vec::from(arranged))
}

/// Highest slot number named anywhere in the template.
pub fn slot_count(template: &[String]) -> usize {
    template
        .iter()
        .flat_map(|command| PLACEHOLDER.captures_iter(command))
        .filter_map(|caps| caps[2].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Write `pairs` (slot 1 first) into a dance template.
pub fn assemble(template: &[String], pairs: &[DancePair]) -> Vec<String> {
    let respaced = warp_spacing(template, pairs.len());
    let mut out = Vec::with_capacity(template.len());
    for (index, command) in template.iter().enumerate() {
        if index == LAYOUT_INDEX {
            out.push(rewrite_layout(command, pairs));
            continue;
        }
        let Some(command) = prune_move_groups(command, pairs.len()) else {
            debug!("dropping '{command}': every mover's slot is empty");
            continue;
        };
        if let Some(slot) = first_unfilled_slot(&command, pairs.len()) {
            debug!("dropping '{command}': slot {slot} is empty");
            continue;
        }
        let command = match respaced.get(&index) {
            Some(x) => rewrite_warp_x(&command, *x),
            None => command,
        };
        out.extend(apply_frame_rules(&substitute(&command, pairs)));
    }
    out
}

/// Load the main-event template and produce the script for this dance.
pub fn assemble_dance_event(
    store: &ScriptStore,
    asset: &str,
    entry: &str,
    year: u32,
    input: &DanceInput,
) -> Result<Script> {
    let template = store.resolve(asset, entry, year)?;
    let roster = store.dance_roster().ok_or(ChoreographyError::MissingRoster)?;
    let slots = slot_count(template.commands());
    if slots == 0 {
        return Err(ChoreographyError::MissingTemplate(template.key.to_string()).into());
    }
    let pairs = pair_dancers(input, roster, slots)?;
    info!(
        "dance for {} ({} slot(s)): {}",
        template.key,
        slots,
        pairs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    let commands = assemble(template.commands(), &pairs);
    Ok(Script::from_commands(template.key.clone(), commands))
}

fn slot_dancer<'a>(pairs: &'a [DancePair], role: &str, slot: usize) -> Option<&'a Dancer> {
    let pair = pairs.get(slot.checked_sub(1)?)?;
    Some(if role == "Leader" { &pair.leader } else { &pair.follower })
}

fn first_unfilled_slot(command: &str, filled: usize) -> Option<usize> {
    PLACEHOLDER
        .captures_iter(command)
        .map(|caps| caps[2].parse::<usize>().unwrap_or(0))
        .find(|slot| *slot == 0 || *slot > filled)
}

fn is_unfilled_slot(token: &str, filled: usize) -> bool {
    match PLACEHOLDER.captures(token) {
        Some(caps) if caps[0].len() == token.len() => {
            let slot = caps[2].parse::<usize>().unwrap_or(0);
            slot == 0 || slot > filled
        },
        _ => false,
    }
}

/// Strip `move` groups whose mover is an empty slot. `None` when no mover is
/// left. Other commands come back unchanged.
fn prune_move_groups(command: &str, filled: usize) -> Option<String> {
    let tokens = match split_command(command) {
        Ok(tokens) if tokens.first().is_some_and(|name| name.eq_ignore_ascii_case("move")) => tokens,
        Ok(_) | Err(_) => return Some(command.to_string()),
    };
    let body = &tokens[1..];
    // a lone trailing token is the continue flag
    let (groups, tail) = body.split_at(body.len() - body.len() % 4);
    if groups.is_empty() {
        return Some(command.to_string());
    }
    let kept: Vec<&[String]> = groups
        .chunks(4)
        .filter(|group| !is_unfilled_slot(&group[0], filled))
        .collect();
    if kept.is_empty() {
        return None;
    }
    if kept.len() == groups.len() / 4 {
        return Some(command.to_string());
    }
    let mut out = vec![tokens[0].clone()];
    for group in kept {
        out.extend(group.iter().cloned());
    }
    out.extend(tail.iter().cloned());
    Some(out.join(" "))
}

fn substitute(command: &str, pairs: &[DancePair]) -> String {
    PLACEHOLDER
        .replace_all(command, |caps: &Captures<'_>| {
            let slot = caps[2].parse::<usize>().unwrap_or(0);
            match slot_dancer(pairs, &caps[1], slot) {
                Some(dancer) => dancer.token(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Keep layout groups for filled slots (renamed) and for everyone else.
fn rewrite_layout(layout: &str, pairs: &[DancePair]) -> String {
    let tokens = match split_command(layout) {
        Ok(tokens) if tokens.len() % 4 == 0 => tokens,
        Ok(_) | Err(_) => {
            warn!("dance layout is not in groups of four; leaving it as written");
            return layout.to_string();
        },
    };
    let mut kept: Vec<String> = Vec::with_capacity(tokens.len());
    for group in tokens.chunks(4) {
        let name = match PLACEHOLDER.captures(&group[0]) {
            Some(caps) if caps[0].len() == group[0].len() => {
                let slot = caps[2].parse::<usize>().unwrap_or(0);
                match slot_dancer(pairs, &caps[1], slot) {
                    Some(dancer) => dancer.token(),
                    None => continue,
                }
            },
            _ => group[0].clone(),
        };
        kept.push(name);
        kept.extend(group[1..].iter().cloned());
    }
    kept.join(" ")
}

/// New x tiles for `warp` commands that name a filled slot, keyed by
/// command index. Warps are grouped into rows by role and y tile.
fn warp_spacing(template: &[String], filled: usize) -> HashMap<usize, i32> {
    // (role, y) -> slot -> (x, command indexes)
    let mut rows: BTreeMap<(String, i32), BTreeMap<usize, (i32, Vec<usize>)>> = BTreeMap::new();
    for (index, command) in template.iter().enumerate().skip(LAYOUT_INDEX + 1) {
        let Ok(tokens) = split_command(command) else {
            continue;
        };
        if tokens.len() < 4 || !tokens[0].eq_ignore_ascii_case("warp") {
            continue;
        }
        let Some(caps) = PLACEHOLDER.captures(&tokens[1]) else {
            continue;
        };
        let (Ok(slot), Ok(x), Ok(y)) = (
            caps[2].parse::<usize>(),
            tokens[2].parse::<i32>(),
            tokens[3].parse::<i32>(),
        ) else {
            continue;
        };
        rows.entry((caps[1].to_string(), y))
            .or_default()
            .entry(slot)
            .or_insert_with(|| (x, Vec::new()))
            .1
            .push(index);
    }

    let mut spacing = HashMap::new();
    for ((role, y), slots) in rows {
        let (Some(min), Some(max)) = (
            slots.values().map(|(x, _)| *x).min(),
            slots.values().map(|(x, _)| *x).max(),
        ) else {
            continue;
        };
        let live: Vec<_> = slots.iter().filter(|(slot, _)| **slot >= 1 && **slot <= filled).collect();
        let count = live.len() as i32;
        for (k, (_, (_, indexes))) in live.into_iter().enumerate() {
            let x = if count == 1 {
                (min + max) / 2
            } else {
                min + (max - min) * k as i32 / (count - 1)
            };
            for index in indexes {
                spacing.insert(*index, x);
            }
        }
        debug!("{role} row at y={y} spread over {min}..={max}");
    }
    spacing
}

fn rewrite_warp_x(command: &str, x: i32) -> String {
    match split_command(command) {
        Ok(mut tokens) if tokens.len() >= 3 => {
            tokens[2] = x.to_string();
            tokens.join(" ")
        },
        _ => command.to_string(),
    }
}

fn apply_frame_rules(command: &str) -> Vec<String> {
    for (rule, replacement) in FRAME_RULES.iter() {
        if rule.is_match(command) {
            return rule
                .replace(command, *replacement)
                .split('/')
                .map(str::to_string)
                .collect();
        }
    }
    vec![command.to_string()]
}
