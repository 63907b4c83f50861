//! High-Score Wagering Round Contract
//!
//! A single shared round record mediates a high-score contest. Players pay a
//! fixed fee to play; the fee is escrowed on this contract and split into a
//! winner-payable pool and an admin commission accrual. Scores submitted
//! before the round deadline track the current winner. Once the deadline
//! passes, the pool is released through a timed, phase-dependent claim:
//! during a grace period only the recorded winner may claim; afterwards any
//! caller may sweep the pool (abandonment policy — the payee is the caller,
//! not the stored winner).
//!
//! ## Phase Model
//! No phase is persisted. Every operation re-derives the current phase from
//! `(paused, deadline, now)`:
//! - `Idle`: `deadline == 0`, no round in flight.
//! - `Playing`: `now < deadline`.
//! - `Grace`: `deadline <= now < deadline + grace`, winner-exclusive claim.
//! - `OpenClaim`: `now >= deadline + grace`, anyone may claim.
//! - `Paused`: admin halt. Blocks `play` only; `score` and `claim` gate on
//!   the deadline window alone, so a paused round can still be settled
//!   (pause -> winner claims -> kill is the decommission path).
//!
//! ## Storage Strategy
//! - `instance()`: Token, Fee, Commission, RoundTime, Grace. Fixed at
//!   `initialize`, immutable thereafter.
//! - `persistent()`: the single `Round` record, TTL-bumped on every write so
//!   an active round never expires mid-cycle.
//!
//! ## Invariant
//! `pool + commission == token.balance(contract_address)` at all times,
//! assuming all inflows go through `play`. Every fee is split exactly once
//! (`pool += fee - commission`, `commission += commission`) and every payout
//! debits the matching counter, so the escrow ledger never invents or loses
//! funds.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Env,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
/// Bumped on every write so the round record never expires mid-cycle.
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AccountNotInitialized   = 1,
    RoundAlreadyInitialized = 2,
    GamePaused              = 3,
    GameNotPaused           = 4,
    PlayInClaimingPhase     = 5,
    ScoreWithoutRound       = 6,
    ScoreInClaimingPhase    = 7,
    ClaimWithoutRound       = 8,
    ClaimInPlayingPhase     = 9,
    NotWinnerInGracePeriod  = 10,
    NotAdmin                = 11,
    ProfitEmpty             = 12,
    KillBeforePausing       = 13,
    KillWithPool            = 14,
    InvalidConfig           = 15,
    Overflow                = 16,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Discriminants for all storage keys.
///
/// Instance keys (Token, Fee, Commission, RoundTime, Grace): contract
/// config, written once at `initialize`. Persistent key (Round): the mutable
/// record, its own TTL bumped on every write.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Token,
    Fee,
    Commission,
    RoundTime,
    Grace,
    // --- persistent() ---
    Round,
}

/// The single round record. Present iff the contract is initialized;
/// removed only by `kill`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Round {
    /// Fixed at `initialize`; immutable thereafter.
    pub admin: Address,
    /// Holder of the current highest score. `None` until the first
    /// successful `score` of a cycle, and again after each `claim`.
    pub winner: Option<Address>,
    /// Current highest submitted score.
    pub score: u32,
    /// Play-window end, epoch seconds. 0 means no round in flight.
    pub deadline: u64,
    /// Escrowed prize, winner-payable. Grows on `play`, zeroed on `claim`.
    pub pool: i128,
    /// Escrowed admin fee accrual. Grows on `play`, zeroed on `profit`,
    /// swept on `kill`.
    pub commission: i128,
    /// Admin halt flag. Blocks `play` and redundant `pause` only.
    pub paused: bool,
}

/// Phase derived from `(paused, deadline, now)`; never stored.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Paused,
    Idle,
    Playing,
    Grace,
    OpenClaim,
}

/// Claim window derived from the stored deadline alone. `phase_of` layers
/// the pause flag on top; `score` and `claim` gate on the window directly
/// so a paused round can still be settled.
#[derive(Copy, Clone, Eq, PartialEq)]
enum Window {
    Idle,
    Playing,
    Grace,
    Open,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    pub admin: Address,
    pub token: Address,
    pub fee: i128,
    pub commission: i128,
}

#[contractevent]
pub struct Played {
    #[topic]
    pub player: Address,
    pub fee: i128,
    pub deadline: u64,
}

#[contractevent]
pub struct HighScore {
    #[topic]
    pub player: Address,
    pub value: u32,
}

#[contractevent]
pub struct Claimed {
    #[topic]
    pub claimer: Address,
    pub amount: i128,
}

#[contractevent]
pub struct Paused {
    pub admin: Address,
}

#[contractevent]
pub struct Resumed {
    pub admin: Address,
}

#[contractevent]
pub struct ProfitWithdrawn {
    #[topic]
    pub admin: Address,
    pub amount: i128,
}

#[contractevent]
pub struct Killed {
    #[topic]
    pub admin: Address,
    pub swept: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct HighScoreRound;

#[contractimpl]
impl HighScoreRound {
    // -----------------------------------------------------------------------
    // initialize
    // -----------------------------------------------------------------------

    /// Create the round record and fix its configuration. May only succeed
    /// once; the caller becomes the immutable admin.
    ///
    /// `token` must be a deployed SEP-41 contract address. Every `play` fee,
    /// `claim` payout, `profit` withdrawal, and `kill` sweep transfers
    /// through it, with this contract's address as the escrow account.
    ///
    /// `grace` is the winner-exclusive claim window after the deadline. It
    /// is an explicit constant rather than being derived from `round_time`.
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        fee: i128,
        commission: i128,
        round_time: u64,
        grace: u64,
    ) -> Result<Round, Error> {
        if env.storage().persistent().has(&DataKey::Round) {
            return Err(Error::RoundAlreadyInitialized);
        }

        admin.require_auth();

        if fee <= 0 || commission < 0 || commission > fee || round_time == 0 || grace == 0 {
            return Err(Error::InvalidConfig);
        }

        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::Fee, &fee);
        env.storage().instance().set(&DataKey::Commission, &commission);
        env.storage().instance().set(&DataKey::RoundTime, &round_time);
        env.storage().instance().set(&DataKey::Grace, &grace);

        let round = Round {
            admin: admin.clone(),
            winner: None,
            score: 0,
            deadline: 0,
            pool: 0,
            commission: 0,
            paused: false,
        };
        write_round(&env, &round);

        Initialized {
            admin,
            token,
            fee,
            commission,
        }
        .publish(&env);

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // play
    // -----------------------------------------------------------------------

    /// Pay the fee and enter the current round.
    ///
    /// The first `play` of a cycle (deadline 0) starts the play window by
    /// setting `deadline = now + round_time`; every later `play` in the same
    /// cycle joins without touching the deadline. The fee is transferred
    /// from the player into escrow and split deterministically:
    /// `pool += fee - commission`, `commission += commission`.
    pub fn play(env: Env, player: Address) -> Result<Round, Error> {
        let mut round = read_round(&env)?;

        player.require_auth();

        let now = env.ledger().timestamp();
        match phase_of(&round, get_grace(&env), now) {
            Phase::Paused => return Err(Error::GamePaused),
            Phase::Grace | Phase::OpenClaim => return Err(Error::PlayInClaimingPhase),
            Phase::Idle => {
                round.deadline = now
                    .checked_add(get_round_time(&env))
                    .ok_or(Error::Overflow)?;
            }
            Phase::Playing => {}
        }

        let fee = get_fee(&env);
        let commission = get_commission(&env);

        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(&player, &env.current_contract_address(), &fee);

        let prize_share = fee.checked_sub(commission).ok_or(Error::Overflow)?;
        round.pool = round.pool.checked_add(prize_share).ok_or(Error::Overflow)?;
        round.commission = round
            .commission
            .checked_add(commission)
            .ok_or(Error::Overflow)?;
        write_round(&env, &round);

        Played {
            player,
            fee,
            deadline: round.deadline,
        }
        .publish(&env);

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // score
    // -----------------------------------------------------------------------

    /// Submit a score for the current round. Only valid while the play
    /// window is open.
    ///
    /// A value above the stored high score makes the caller the current
    /// winner; a value at or below it is a successful no-op, leaving both
    /// `score` and `winner` unchanged.
    pub fn score(env: Env, player: Address, value: u32) -> Result<Round, Error> {
        let mut round = read_round(&env)?;

        player.require_auth();

        let now = env.ledger().timestamp();
        match window_of(round.deadline, get_grace(&env), now) {
            Window::Idle => return Err(Error::ScoreWithoutRound),
            Window::Grace | Window::Open => return Err(Error::ScoreInClaimingPhase),
            Window::Playing => {}
        }

        if value > round.score {
            round.score = value;
            round.winner = Some(player.clone());
            write_round(&env, &round);

            HighScore { player, value }.publish(&env);
        }

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // claim
    // -----------------------------------------------------------------------

    /// Release the escrowed pool once the play window has closed.
    ///
    /// During the grace period only the stored winner may claim. After the
    /// grace period expires, any caller may claim and becomes the payee —
    /// the abandonment sweep for pools a winner never collected. A
    /// successful claim pays out the pool and resets the record for the
    /// next cycle (`pool`, `deadline`, `score` zeroed, `winner` cleared).
    ///
    /// The record is reset before the external token transfer, mirroring
    /// the accounting-before-transfer ordering used across the platform.
    pub fn claim(env: Env, claimer: Address) -> Result<Round, Error> {
        let mut round = read_round(&env)?;

        claimer.require_auth();

        let now = env.ledger().timestamp();
        match window_of(round.deadline, get_grace(&env), now) {
            Window::Idle => return Err(Error::ClaimWithoutRound),
            Window::Playing => return Err(Error::ClaimInPlayingPhase),
            Window::Grace => {
                if round.winner.as_ref() != Some(&claimer) {
                    return Err(Error::NotWinnerInGracePeriod);
                }
            }
            Window::Open => {}
        }

        let amount = round.pool;
        round.pool = 0;
        round.deadline = 0;
        round.score = 0;
        round.winner = None;
        write_round(&env, &round);

        // A zero pool (possible when fee == commission) still resets the
        // record; there is just nothing to transfer.
        if amount > 0 {
            let token = get_token(&env);
            TokenClient::new(&env, &token).transfer(
                &env.current_contract_address(),
                &claimer,
                &amount,
            );
        }

        Claimed { claimer, amount }.publish(&env);

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // pause / resume
    // -----------------------------------------------------------------------

    /// Halt play. Admin only. Errors if already paused.
    ///
    /// Pausing does not clear an in-flight round: `deadline`, `pool`,
    /// `score`, and `winner` are untouched, and `score`/`claim` keep
    /// working against the deadline window.
    pub fn pause(env: Env, admin: Address) -> Result<Round, Error> {
        let mut round = read_round(&env)?;
        require_admin(&round, &admin)?;

        if round.paused {
            return Err(Error::GamePaused);
        }

        round.paused = true;
        write_round(&env, &round);

        Paused { admin }.publish(&env);

        Ok(round)
    }

    /// Lift the halt. Admin only. Errors if not paused.
    pub fn resume(env: Env, admin: Address) -> Result<Round, Error> {
        let mut round = read_round(&env)?;
        require_admin(&round, &admin)?;

        if !round.paused {
            return Err(Error::GameNotPaused);
        }

        round.paused = false;
        write_round(&env, &round);

        Resumed { admin }.publish(&env);

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // profit
    // -----------------------------------------------------------------------

    /// Withdraw the accrued commission to the admin. Errors if nothing has
    /// accrued since the last withdrawal.
    pub fn profit(env: Env, admin: Address) -> Result<Round, Error> {
        let mut round = read_round(&env)?;
        require_admin(&round, &admin)?;

        if round.commission == 0 {
            return Err(Error::ProfitEmpty);
        }

        let amount = round.commission;
        round.commission = 0;
        write_round(&env, &round);

        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(&env.current_contract_address(), &admin, &amount);

        ProfitWithdrawn { admin, amount }.publish(&env);

        Ok(round)
    }

    // -----------------------------------------------------------------------
    // kill
    // -----------------------------------------------------------------------

    /// Decommission the round permanently. Admin only; requires the game to
    /// be paused and the pool to be empty (claimed out), so no player funds
    /// can be swept.
    ///
    /// The entire remaining escrow balance — leftover commission included —
    /// is transferred to the admin, and the record and configuration are
    /// removed. Afterwards the round is unfetchable and every operation
    /// fails with `AccountNotInitialized`.
    pub fn kill(env: Env, admin: Address) -> Result<(), Error> {
        let round = read_round(&env)?;
        require_admin(&round, &admin)?;

        if !round.paused {
            return Err(Error::KillBeforePausing);
        }
        if round.pool != 0 {
            return Err(Error::KillWithPool);
        }

        let token = get_token(&env);
        let token_client = TokenClient::new(&env, &token);
        let contract_address = env.current_contract_address();
        let swept = token_client.balance(&contract_address);

        env.storage().persistent().remove(&DataKey::Round);
        env.storage().instance().remove(&DataKey::Token);
        env.storage().instance().remove(&DataKey::Fee);
        env.storage().instance().remove(&DataKey::Commission);
        env.storage().instance().remove(&DataKey::RoundTime);
        env.storage().instance().remove(&DataKey::Grace);

        if swept > 0 {
            token_client.transfer(&contract_address, &admin, &swept);
        }

        Killed { admin, swept }.publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // views
    // -----------------------------------------------------------------------

    /// Returns the round record.
    pub fn get_round(env: Env) -> Result<Round, Error> {
        read_round(&env)
    }

    /// Returns the phase derived at the current ledger timestamp.
    pub fn current_phase(env: Env) -> Result<Phase, Error> {
        let round = read_round(&env)?;
        Ok(phase_of(&round, get_grace(&env), env.ledger().timestamp()))
    }
}

// ---------------------------------------------------------------------------
// Phase derivation
// ---------------------------------------------------------------------------

fn window_of(deadline: u64, grace: u64, now: u64) -> Window {
    if deadline == 0 {
        Window::Idle
    } else if now < deadline {
        Window::Playing
    } else if now < deadline.saturating_add(grace) {
        Window::Grace
    } else {
        Window::Open
    }
}

fn phase_of(round: &Round, grace: u64, now: u64) -> Phase {
    if round.paused {
        return Phase::Paused;
    }
    match window_of(round.deadline, grace, now) {
        Window::Idle => Phase::Idle,
        Window::Playing => Phase::Playing,
        Window::Grace => Phase::Grace,
        Window::Open => Phase::OpenClaim,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn read_round(env: &Env) -> Result<Round, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Round)
        .ok_or(Error::AccountNotInitialized)
}

/// Write the round record and extend its TTL in one step.
fn write_round(env: &Env, round: &Round) {
    env.storage().persistent().set(&DataKey::Round, round);
    env.storage().persistent().extend_ttl(
        &DataKey::Round,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

/// Verify that `caller` is the stored admin and has signed the invocation.
fn require_admin(round: &Round, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    if caller != &round.admin {
        return Err(Error::NotAdmin);
    }
    Ok(())
}

fn get_token(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .expect("HighScoreRound: token not set")
}

fn get_fee(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::Fee)
        .expect("HighScoreRound: fee not set")
}

fn get_commission(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::Commission)
        .expect("HighScoreRound: commission not set")
}

fn get_round_time(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::RoundTime)
        .expect("HighScoreRound: round time not set")
}

fn get_grace(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::Grace)
        .expect("HighScoreRound: grace not set")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
