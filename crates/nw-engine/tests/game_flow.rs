//! End-to-end games driven through the public engine API with a
//! recording gateway and pinned chance policies.

use std::collections::HashSet;

use nw_core::{ForcedChance, GameConfig, NightAbility, PlayerId, Role};
use nw_engine::gateway::DeliveryError;
use nw_engine::{
    Announcement, ChatId, Game, Gateway, NightAction, Phase, PhaseTimer, TimerId, VoteOutcome,
};

/// Records every outbound call and can be told to fail deliveries to
/// specific players.
#[derive(Default)]
struct RecordingGateway {
    broadcasts: Vec<Announcement>,
    privates: Vec<(PlayerId, Announcement)>,
    scheduled: Vec<(TimerId, PhaseTimer, u64)>,
    cancelled: Vec<TimerId>,
    unreachable: HashSet<PlayerId>,
    next_timer: u64,
}

impl RecordingGateway {
    fn new() -> Self {
        Self::default()
    }

    fn failing_for(ids: &[PlayerId]) -> Self {
        Self {
            unreachable: ids.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn last_timer(&self) -> TimerId {
        self.scheduled.last().expect("no timer scheduled").0
    }

    fn morning_reports(&self) -> Vec<&nw_engine::NightReport> {
        self.broadcasts
            .iter()
            .filter_map(|a| match a {
                Announcement::MorningReport(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl Gateway for RecordingGateway {
    fn deliver_private(
        &mut self,
        player: PlayerId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError> {
        if self.unreachable.contains(&player) {
            return Err(DeliveryError);
        }
        self.privates.push((player, announcement.clone()));
        Ok(())
    }

    fn broadcast(&mut self, _chat: ChatId, announcement: &Announcement) {
        self.broadcasts.push(announcement.clone());
    }

    fn schedule(&mut self, _chat: ChatId, timer: PhaseTimer, seconds: u64) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.scheduled.push((id, timer, seconds));
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.cancelled.push(timer);
    }

    fn is_administrator(&mut self, _chat: ChatId, _user: PlayerId) -> bool {
        false
    }
}

/// A 5-human game with no perks and a deterministic deal.
fn started_game(gateway: &mut RecordingGateway) -> Game {
    let mut game = Game::with_chance(
        ChatId(77),
        PlayerId(1),
        GameConfig::default(),
        Box::new(ForcedChance::default()),
    );
    for i in 1..=5 {
        game.join(PlayerId(i), format!("p{i}")).unwrap();
    }
    game.begin(PlayerId(1), gateway).unwrap();
    game
}

fn find_role(game: &Game, role: Role) -> PlayerId {
    game.session()
        .players()
        .iter()
        .find(|p| p.role == Some(role))
        .map(|p| p.id)
        .expect("role not dealt")
}

fn villagers(game: &Game) -> Vec<PlayerId> {
    game.session()
        .players()
        .iter()
        .filter(|p| p.role == Some(Role::Villager))
        .map(|p| p.id)
        .collect()
}

/// Everyone alive abstains, skipping the day into the next night.
fn skip_day(game: &mut Game, gateway: &mut RecordingGateway) {
    assert_eq!(game.session().phase, Phase::Discussion);
    game.timer_fired(gateway.last_timer(), gateway);
    assert_eq!(game.session().phase, Phase::Nomination);
    let living: Vec<PlayerId> = game.session().living().map(|p| p.id).collect();
    for id in living {
        game.submit_nomination(id, None, gateway).unwrap();
    }
    assert_eq!(game.session().phase, Phase::Night);
}

#[test]
fn role_cards_reach_every_human() {
    let mut gateway = RecordingGateway::new();
    let game = started_game(&mut gateway);
    let cards = gateway
        .privates
        .iter()
        .filter(|(_, a)| matches!(a, Announcement::RoleCard { .. }))
        .count();
    assert_eq!(cards, 5);
    assert_eq!(game.session().phase, Phase::Night);
    assert_eq!(game.session().round, 1);
}

#[test]
fn saved_round_then_fatal_round() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);
    let citizens = villagers(&game);
    let (victim_a, victim_b) = (citizens[0], citizens[1]);

    // Round 1: the kill and the heal land on the same villager.
    game.submit_night_action(godfather, NightAction::Kill(victim_a), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(victim_a), &mut gateway)
        .unwrap();
    game.submit_night_action(detective, NightAction::Investigate(victim_a), &mut gateway)
        .unwrap();

    // All actors submitted: the night resolves without the timer.
    assert_eq!(game.session().phase, Phase::Discussion);
    let reports = gateway.morning_reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].deaths.is_empty());
    assert_eq!(reports[0].saved.as_deref(), Some("p4"));
    assert!(game.session().player(victim_a).unwrap().alive);

    // Round 2: nobody nominates; night again, and no heal arrives.
    skip_day(&mut game, &mut gateway);
    assert_eq!(game.session().round, 2);
    game.submit_night_action(godfather, NightAction::Kill(victim_b), &mut gateway)
        .unwrap();
    // The doctor and detective never act; the timer closes the night.
    game.timer_fired(gateway.last_timer(), &mut gateway);

    let reports = gateway.morning_reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].deaths.len(), 1);
    assert_eq!(reports[1].deaths[0].id, victim_b);
    assert_eq!(reports[1].deaths[0].role, Role::Villager);
    assert!(!game.session().player(victim_b).unwrap().alive);
    assert_eq!(game.session().phase, Phase::Discussion);
}

#[test]
fn completion_wins_the_race_and_the_late_timer_is_discarded() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);
    let victim = villagers(&game)[0];

    let night_timer = gateway.last_timer();
    game.submit_night_action(godfather, NightAction::Kill(victim), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(doctor), &mut gateway)
        .unwrap();
    game.submit_night_action(detective, NightAction::Investigate(godfather), &mut gateway)
        .unwrap();
    assert_eq!(gateway.morning_reports().len(), 1);

    // The night timer fires late: the resolver must not run again.
    game.timer_fired(night_timer, &mut gateway);
    assert_eq!(gateway.morning_reports().len(), 1);
    assert_eq!(game.session().phase, Phase::Discussion);
}

#[test]
fn detective_bullet_is_single_use() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);
    let citizens = villagers(&game);

    game.submit_night_action(detective, NightAction::Shoot(citizens[0]), &mut gateway)
        .unwrap();
    game.submit_night_action(godfather, NightAction::Kill(citizens[1]), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(doctor), &mut gateway)
        .unwrap();

    // Two villagers die; 1 mafia vs 2 citizens keeps the game alive.
    assert_eq!(game.session().phase, Phase::Discussion);
    skip_day(&mut game, &mut gateway);

    assert_eq!(
        game.submit_night_action(detective, NightAction::Shoot(godfather), &mut gateway),
        Err(nw_engine::EngineError::AbilityExhausted)
    );
    // An investigation is still available.
    game.submit_night_action(detective, NightAction::Investigate(godfather), &mut gateway)
        .unwrap();
}

#[test]
fn investigation_of_the_godfather_reads_clean() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);

    game.submit_night_action(detective, NightAction::Investigate(godfather), &mut gateway)
        .unwrap();
    game.submit_night_action(godfather, NightAction::Kill(doctor), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(doctor), &mut gateway)
        .unwrap();

    let check = gateway
        .privates
        .iter()
        .find_map(|(to, a)| match a {
            Announcement::Investigation(result) if *to == detective => Some(result),
            _ => None,
        })
        .expect("no investigation delivered");
    assert!(!check.reported_mafia);
}

#[test]
fn elimination_through_both_vote_rounds() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);
    let citizens = villagers(&game);
    let target = citizens[0];

    game.submit_night_action(godfather, NightAction::Kill(citizens[1]), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(citizens[1]), &mut gateway)
        .unwrap();
    game.submit_night_action(detective, NightAction::Investigate(target), &mut gateway)
        .unwrap();
    game.timer_fired(gateway.last_timer(), &mut gateway); // close discussion
    assert_eq!(game.session().phase, Phase::Nomination);

    // Everyone but the target nominates the target; the target abstains.
    let living: Vec<PlayerId> = game.session().living().map(|p| p.id).collect();
    for id in &living {
        let choice = if *id == target { None } else { Some(target) };
        game.submit_nomination(*id, choice, &mut gateway).unwrap();
    }
    assert_eq!(game.session().phase, Phase::FinalVote);

    for id in &living {
        game.submit_final_vote(*id, true, &mut gateway).unwrap();
    }

    let report = gateway
        .broadcasts
        .iter()
        .find_map(|a| match a {
            Announcement::VoteReport(report) => Some(report),
            _ => None,
        })
        .expect("no vote report");
    assert_eq!(report.yes, 5);
    assert_eq!(report.no, 0);
    assert_eq!(
        report.outcome,
        VoteOutcome::Eliminated {
            role: Role::Villager
        }
    );
    assert!(!game.session().player(target).unwrap().alive);
    // 1 mafia vs 3 citizens: the game continues into night 2.
    assert_eq!(game.session().phase, Phase::Night);
    assert_eq!(game.session().round, 2);
}

#[test]
fn rope_break_spares_the_nominee() {
    let mut gateway = RecordingGateway::new();
    let mut game = Game::with_chance(
        ChatId(78),
        PlayerId(1),
        GameConfig::default(),
        Box::new(ForcedChance {
            rope_breaks: true,
            ..ForcedChance::default()
        }),
    );
    for i in 1..=5 {
        game.join(PlayerId(i), format!("p{i}")).unwrap();
    }
    game.begin(PlayerId(1), &mut gateway).unwrap();
    // Close the night by timer (nobody acts), then the discussion.
    game.timer_fired(gateway.last_timer(), &mut gateway);
    game.timer_fired(gateway.last_timer(), &mut gateway);
    assert_eq!(game.session().phase, Phase::Nomination);

    let target = villagers(&game)[0];
    let living: Vec<PlayerId> = game.session().living().map(|p| p.id).collect();
    for id in &living {
        let choice = if *id == target { None } else { Some(target) };
        game.submit_nomination(*id, choice, &mut gateway).unwrap();
    }
    for id in &living {
        game.submit_final_vote(*id, true, &mut gateway).unwrap();
    }

    let report = gateway
        .broadcasts
        .iter()
        .find_map(|a| match a {
            Announcement::VoteReport(report) => Some(report),
            _ => None,
        })
        .expect("no vote report");
    assert_eq!(report.outcome, VoteOutcome::RopeBroke);
    assert!(game.session().player(target).unwrap().alive);
    assert_eq!(game.session().phase, Phase::Night);
}

#[test]
fn mafia_reaching_parity_ends_the_game() {
    let mut gateway = RecordingGateway::new();
    let mut game = started_game(&mut gateway);
    let godfather = find_role(&game, Role::Godfather);
    let doctor = find_role(&game, Role::Doctor);
    let detective = find_role(&game, Role::Detective);
    let citizens = villagers(&game);

    // Night 1 kills a villager: 1 mafia vs 3 citizens, game continues.
    game.submit_night_action(godfather, NightAction::Kill(citizens[0]), &mut gateway)
        .unwrap();
    game.submit_night_action(doctor, NightAction::Heal(doctor), &mut gateway)
        .unwrap();
    game.submit_night_action(detective, NightAction::Investigate(godfather), &mut gateway)
        .unwrap();
    assert!(!game.is_over());
    skip_day(&mut game, &mut gateway);

    // Night 2 kills the detective: 1 vs 2, still on.
    game.submit_night_action(godfather, NightAction::Kill(detective), &mut gateway)
        .unwrap();
    game.timer_fired(gateway.last_timer(), &mut gateway);
    assert!(!game.is_over());
    skip_day(&mut game, &mut gateway);

    // Night 3 kills the last villager: 1 vs 1 is parity, a mafia win.
    game.submit_night_action(godfather, NightAction::Kill(citizens[1]), &mut gateway)
        .unwrap();
    game.timer_fired(gateway.last_timer(), &mut gateway);

    assert!(game.is_over());
    assert_eq!(game.session().phase, Phase::Ended);
    let summary = gateway
        .broadcasts
        .iter()
        .find_map(|a| match a {
            Announcement::GameOver(summary) => Some(summary),
            _ => None,
        })
        .expect("no game-over broadcast");
    assert_eq!(
        summary.verdict,
        nw_engine::Verdict::MafiaWin { forced: false }
    );
    assert_eq!(summary.reveal.len(), 5);
}

#[test]
fn unreachable_players_revert_the_start() {
    let mut gateway = RecordingGateway::failing_for(&[PlayerId(5)]);
    let mut game = Game::with_chance(
        ChatId(79),
        PlayerId(1),
        GameConfig::default(),
        Box::new(ForcedChance::default()),
    );
    for i in 1..=5 {
        game.join(PlayerId(i), format!("p{i}")).unwrap();
    }
    let result = game.begin(PlayerId(1), &mut gateway);
    assert_eq!(
        result,
        Err(nw_engine::EngineError::UnreachablePlayers { count: 1 })
    );
    assert_eq!(game.session().phase, Phase::Registration);
    assert_eq!(game.session().players().len(), 4);
    assert!(game.session().players().iter().all(|p| p.role.is_none()));
}

#[test]
fn unreachable_player_with_enough_left_proceeds() {
    let mut gateway = RecordingGateway::failing_for(&[PlayerId(6)]);
    let mut game = Game::with_chance(
        ChatId(80),
        PlayerId(1),
        GameConfig::default(),
        Box::new(ForcedChance::default()),
    );
    for i in 1..=6 {
        game.join(PlayerId(i), format!("p{i}")).unwrap();
    }
    game.begin(PlayerId(1), &mut gateway).unwrap();
    assert_eq!(game.session().phase, Phase::Night);
    assert_eq!(game.session().players().len(), 5);
}

#[test]
fn a_full_bot_game_runs_to_a_verdict() {
    use nw_core::DiceChance;

    let mut gateway = RecordingGateway::new();
    let mut game = Game::with_chance(
        ChatId(81),
        PlayerId(1),
        GameConfig::default(),
        Box::new(DiceChance::seeded(2024)),
    );
    game.join(PlayerId(1), "Ivan").unwrap();
    game.join(PlayerId(2), "Olena").unwrap();
    game.add_automated(3).unwrap();
    game.begin(PlayerId(1), &mut gateway).unwrap();

    // Drive the two humans with the simplest legal choices; fire
    // whatever timer is pending when a phase stalls.
    for _ in 0..500 {
        if game.is_over() {
            break;
        }
        match game.session().phase {
            Phase::Night => {
                let actors: Vec<(PlayerId, Role)> = game
                    .session()
                    .living()
                    .filter(|p| !p.is_automated())
                    .filter_map(|p| p.role.map(|r| (p.id, r)))
                    .collect();
                for (id, role) in actors {
                    if game.session().night_actions.contains_key(&id) {
                        continue;
                    }
                    let target = game
                        .session()
                        .living()
                        .find(|p| p.id != id && !(role == Role::Godfather && p.is_mafia()))
                        .map(|p| p.id);
                    let action = match (role.ability(), target) {
                        (Some(NightAbility::Kill), Some(t)) => Some(NightAction::Kill(t)),
                        (Some(NightAbility::Heal), Some(t)) => Some(NightAction::Heal(t)),
                        (Some(NightAbility::Investigate), Some(t)) => {
                            Some(NightAction::Investigate(t))
                        }
                        _ => None,
                    };
                    if let Some(action) = action {
                        let _ = game.submit_night_action(id, action, &mut gateway);
                    }
                }
                if game.session().phase == Phase::Night {
                    game.timer_fired(gateway.last_timer(), &mut gateway);
                }
            }
            Phase::Discussion => game.timer_fired(gateway.last_timer(), &mut gateway),
            Phase::Nomination => {
                let humans: Vec<PlayerId> = game
                    .session()
                    .living()
                    .filter(|p| !p.is_automated())
                    .map(|p| p.id)
                    .collect();
                for id in humans {
                    let _ = game.submit_nomination(id, None, &mut gateway);
                }
                if game.session().phase == Phase::Nomination {
                    game.timer_fired(gateway.last_timer(), &mut gateway);
                }
            }
            Phase::FinalVote => {
                let humans: Vec<PlayerId> = game
                    .session()
                    .living()
                    .filter(|p| !p.is_automated())
                    .map(|p| p.id)
                    .collect();
                for id in humans {
                    let _ = game.submit_final_vote(id, true, &mut gateway);
                }
                if game.session().phase == Phase::FinalVote {
                    game.timer_fired(gateway.last_timer(), &mut gateway);
                }
            }
            _ => break,
        }
    }

    assert!(game.is_over(), "the seeded bot game must reach a verdict");
    assert!(
        gateway
            .broadcasts
            .iter()
            .any(|a| matches!(a, Announcement::GameOver(_)))
    );
}
