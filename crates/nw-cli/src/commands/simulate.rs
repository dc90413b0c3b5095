//! `nw simulate`: run a fully automated local game.
//!
//! Human seats are driven by a scripted stand-in policy (random but
//! legal choices), automated seats by the engine's own bot controller.
//! The same seed replays the same game, transcript and all.

use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;

use nw_core::role::{MAX_PLAYERS, MIN_PLAYERS};
use nw_core::{GameConfig, NightAbility, PlayerId};
use nw_engine::gateway::DeliveryError;
use nw_engine::{
    Announcement, ChatId, Game, Gateway, NightAction, Phase, PhaseTimer, SessionRegistry, TimerId,
};

const HUMAN_NAMES: [&str; 8] = [
    "Ivan", "Olena", "Taras", "Sofia", "Dmytro", "Kateryna", "Yurii", "Lesia",
];

/// Upper bound on phase steps before the simulation gives up.
const MAX_STEPS: usize = 1000;

/// A gateway that prints announcements to the terminal and hands out
/// timer ids for the driver loop to fire.
struct TerminalGateway {
    next_timer: u64,
    last: Option<TimerId>,
}

impl TerminalGateway {
    fn new() -> Self {
        Self {
            next_timer: 0,
            last: None,
        }
    }

    fn last_timer(&self) -> Option<TimerId> {
        self.last
    }
}

impl Gateway for TerminalGateway {
    fn deliver_private(
        &mut self,
        player: PlayerId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError> {
        println!("{}", format!("  [dm {player}] {announcement}").dimmed());
        Ok(())
    }

    fn broadcast(&mut self, _chat: ChatId, announcement: &Announcement) {
        match announcement {
            Announcement::NightBegins { .. } | Announcement::GameOver(_) => {
                println!("{}", announcement.to_string().bold());
            }
            _ => println!("{announcement}"),
        }
    }

    fn schedule(&mut self, _chat: ChatId, _timer: PhaseTimer, _seconds: u64) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.last = Some(id);
        id
    }

    fn cancel(&mut self, _timer: TimerId) {}

    fn is_administrator(&mut self, _chat: ChatId, _user: PlayerId) -> bool {
        true
    }
}

/// Run a seeded game to its verdict.
pub fn run(seed: u64, humans: usize, bots: usize) -> Result<(), String> {
    if humans == 0 {
        return Err("at least one human seat is required".into());
    }
    let total = humans + bots;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&total) {
        return Err(format!(
            "need between {MIN_PLAYERS} and {MAX_PLAYERS} participants, got {total}"
        ));
    }

    let registry = SessionRegistry::new();
    let chat = ChatId(1);
    let config = GameConfig::default().with_seed(seed);
    let handle = registry
        .create(chat, PlayerId(1), config)
        .map_err(|e| e.to_string())?;
    let mut game = handle.lock().map_err(|_| "session lock poisoned".to_string())?;
    let mut gateway = TerminalGateway::new();

    for i in 0..humans {
        let name = HUMAN_NAMES[i % HUMAN_NAMES.len()];
        game.join(PlayerId(i as i64 + 1), name)
            .map_err(|e| e.to_string())?;
    }
    let bot_names = game.add_automated(bots).map_err(|e| e.to_string())?;
    if !bot_names.is_empty() {
        println!("Bots joined: {}", bot_names.join(", "));
    }

    println!("Starting a {total}-player game (seed {seed})...");
    game.begin(PlayerId(1), &mut gateway)
        .map_err(|e| e.to_string())?;

    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    for _ in 0..MAX_STEPS {
        if game.is_over() {
            break;
        }
        match game.session().phase {
            Phase::Night => drive_night(&mut game, &mut gateway, &mut rng),
            Phase::Discussion => fire_timer(&mut game, &mut gateway),
            Phase::Nomination => drive_nominations(&mut game, &mut gateway, &mut rng),
            Phase::FinalVote => drive_ballots(&mut game, &mut gateway, &mut rng),
            _ => break,
        }
    }

    if game.is_over() {
        Ok(())
    } else {
        Err(format!("no verdict after {MAX_STEPS} steps"))
    }
}

fn fire_timer(game: &mut Game, gateway: &mut TerminalGateway) {
    if let Some(timer) = gateway.last_timer() {
        game.timer_fired(timer, gateway);
    }
}

fn living_humans(game: &Game) -> Vec<PlayerId> {
    game.session()
        .living()
        .filter(|p| !p.is_automated())
        .map(|p| p.id)
        .collect()
}

fn pick(rng: &mut StdRng, candidates: &[PlayerId]) -> Option<PlayerId> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}

fn drive_night(game: &mut Game, gateway: &mut TerminalGateway, rng: &mut StdRng) {
    // Items first: a throw never completes the night, so nothing is
    // lost if the last action resolves it.
    let throwers: Vec<PlayerId> = game
        .session()
        .living()
        .filter(|p| !p.is_automated() && p.item.is_some())
        .map(|p| p.id)
        .collect();
    for thrower in throwers {
        if !rng.random_bool(0.5) {
            continue;
        }
        let targets: Vec<PlayerId> = game
            .session()
            .living()
            .filter(|p| p.id != thrower)
            .map(|p| p.id)
            .collect();
        if let Some(target) = pick(rng, &targets) {
            let _ = game.submit_throw(thrower, Some(target), gateway);
        }
    }

    let actors: Vec<PlayerId> = living_humans(game);
    for actor in actors {
        if game.session().phase != Phase::Night
            || game.session().night_actions.contains_key(&actor)
        {
            continue;
        }
        let Some(role) = game.session().player(actor).and_then(|p| p.role) else {
            continue;
        };
        let action = match role.ability() {
            Some(NightAbility::Kill) => {
                let targets: Vec<PlayerId> = game
                    .session()
                    .living()
                    .filter(|p| !p.is_mafia())
                    .map(|p| p.id)
                    .collect();
                pick(rng, &targets).map(NightAction::Kill)
            }
            Some(NightAbility::Heal) => {
                let barred_self = game.session().last_healed == Some(actor);
                let targets: Vec<PlayerId> = game
                    .session()
                    .living()
                    .filter(|p| p.id != actor || !barred_self)
                    .map(|p| p.id)
                    .collect();
                pick(rng, &targets).map(NightAction::Heal)
            }
            Some(NightAbility::Investigate) => {
                let targets: Vec<PlayerId> = game
                    .session()
                    .living()
                    .filter(|p| p.id != actor)
                    .map(|p| p.id)
                    .collect();
                let shoot = !game.session().gun_fired && rng.random_bool(0.25);
                pick(rng, &targets).map(|t| {
                    if shoot {
                        NightAction::Shoot(t)
                    } else {
                        NightAction::Investigate(t)
                    }
                })
            }
            None => None,
        };
        if let Some(action) = action {
            if let Err(err) = game.submit_night_action(actor, action, gateway) {
                log::debug!("stand-in action rejected: {err}");
            }
        }
    }
    if game.session().phase == Phase::Night {
        fire_timer(game, gateway);
    }
}

fn drive_nominations(game: &mut Game, gateway: &mut TerminalGateway, rng: &mut StdRng) {
    for voter in living_humans(game) {
        if game.session().phase != Phase::Nomination {
            break;
        }
        if game.session().nominations.contains_key(&voter) {
            continue;
        }
        let choice = if rng.random_bool(0.7) {
            let targets: Vec<PlayerId> = game
                .session()
                .living()
                .filter(|p| p.id != voter)
                .map(|p| p.id)
                .collect();
            pick(rng, &targets)
        } else {
            None
        };
        let _ = game.submit_nomination(voter, choice, gateway);
    }
    if game.session().phase == Phase::Nomination {
        fire_timer(game, gateway);
    }
}

fn drive_ballots(game: &mut Game, gateway: &mut TerminalGateway, rng: &mut StdRng) {
    for voter in living_humans(game) {
        if game.session().phase != Phase::FinalVote {
            break;
        }
        if game.session().ballots.contains_key(&voter) {
            continue;
        }
        let approve = rng.random_bool(0.5);
        let _ = game.submit_final_vote(voter, approve, gateway);
    }
    if game.session().phase == Phase::FinalVote {
        fire_timer(game, gateway);
    }
}
