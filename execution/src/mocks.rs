use crate::{committed, genesis::initialize, state::Memory, state_transition, State};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use commonware_math::algebra::Random;
use rand::{rngs::StdRng, SeedableRng};
use wagerpool_types::{
    execution::{Event, Instruction, Output, Transaction},
    house::{Amount, Holder, HouseError, Role, Roles, ONE},
    Genesis, GenesisConfig,
};

/// Pool principal staked by [`Fixture::stake_for_market`]; at the default 1% borrow limit this
/// covers the default match seed.
pub const MARKET_STAKE: Amount = 10_000 * ONE;

/// Whole tokens in base units.
pub fn tokens(value: u128) -> Amount {
    value * ONE
}

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::random(&mut rng);
    let public = private.public_key();
    (private, public)
}

/// Default genesis with the given role grants and token allocations.
pub fn create_genesis(
    roles: Vec<(PublicKey, Role)>,
    allocations: Vec<(PublicKey, Amount)>,
) -> Genesis {
    let mut genesis = GenesisConfig::default()
        .validate()
        .expect("default genesis is valid");
    genesis.roles = Roles::new(roles);
    genesis.allocations = allocations;
    genesis
}

/// In-memory state initialized at genesis.
pub async fn create_state(genesis: &Genesis) -> Memory {
    let mut state = Memory::default();
    initialize(&mut state, genesis)
        .await
        .expect("Failed to initialize state");
    state
}

/// Executes `txs` as the next block and returns the emitted events.
pub async fn execute_block<S: State>(
    state: &mut S,
    roles: &Roles,
    timestamp: u64,
    txs: Vec<Transaction>,
) -> Vec<Event> {
    let (height, _) = committed(state).await.expect("read commit");
    let result =
        state_transition::execute_state_transition(state, roles, height + 1, timestamp, txs)
            .await
            .expect("state transition");
    result
        .outputs
        .into_iter()
        .filter_map(|output| match output {
            Output::Event(event) => Some(event),
            _ => None,
        })
        .collect()
}

/// Domain errors carried by rejection events, in order.
pub fn rejections(events: &[Event]) -> Vec<HouseError> {
    events.iter().filter_map(Event::rejection).collect()
}

/// Account that signs with sequential nonces.
pub struct Actor {
    private: PrivateKey,
    pub public: PublicKey,
    nonce: u64,
}

impl Actor {
    pub fn new(seed: u64) -> Self {
        let (private, public) = create_account_keypair(seed);
        Self {
            private,
            public,
            nonce: 0,
        }
    }

    pub fn holder(&self) -> Holder {
        Holder::Account(self.public.clone())
    }

    pub fn sign(&mut self, instruction: Instruction) -> Transaction {
        let tx = Transaction::sign(&self.private, self.nonce, instruction);
        self.nonce += 1;
        tx
    }
}

/// A chain with one account per role plus funded users.
pub struct Fixture {
    pub state: Memory,
    pub roles: Roles,
    pub admin: Actor,
    pub owner: Actor,
    pub operator: Actor,
    pub users: Vec<Actor>,
}

impl Fixture {
    /// Has the pool admin stake [`MARKET_STAKE`] so the market can borrow its seed.
    pub async fn stake_for_market(&mut self, timestamp: u64) {
        let txs = vec![
            self.admin.sign(Instruction::Approve {
                spender: Holder::Pool,
                amount: MARKET_STAKE,
            }),
            self.admin.sign(Instruction::Stake {
                amount: MARKET_STAKE,
            }),
        ];
        let events = execute_block(&mut self.state, &self.roles, timestamp, txs).await;
        assert!(rejections(&events).is_empty(), "{events:?}");
    }
}

/// Builds a [`Fixture`] where every account (including the privileged ones) holds `allocation`.
pub async fn create_fixture(users: usize, allocation: Amount) -> Fixture {
    let admin = Actor::new(1_000);
    let owner = Actor::new(1_001);
    let operator = Actor::new(1_002);
    let users: Vec<Actor> = (1..=users as u64).map(Actor::new).collect();

    let roles = vec![
        (admin.public.clone(), Role::PoolAdmin),
        (owner.public.clone(), Role::MarketOwner),
        (operator.public.clone(), Role::MarketOperator),
    ];
    let allocations = [&admin, &owner, &operator]
        .into_iter()
        .chain(users.iter())
        .map(|actor| (actor.public.clone(), allocation))
        .collect();
    let genesis = create_genesis(roles, allocations);
    let state = create_state(&genesis).await;

    Fixture {
        state,
        roles: genesis.roles,
        admin,
        owner,
        operator,
        users,
    }
}
