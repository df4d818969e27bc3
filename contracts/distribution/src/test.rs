#![cfg(test)]
use super::*;
use morpheus_gateway_mock::{GatewayMock, GatewayMockClient};
use morpheus_l1_sender::{L1Sender, L1SenderClient as SenderClient, SenderConfig};
use morpheus_l2_message_receiver::{L2MessageReceiver, L2MessageReceiverClient, ReceiverConfig};
use morpheus_reward_token::{RewardToken, RewardTokenClient};
use morpheus_shared::WITHDRAW_ALL;
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::xdr::ToXdr;
use soroban_sdk::{vec, String, I256};

const DAY: u64 = 86400;
const TOKEN: i128 = 1_000_000_000_000_000_000;
const L1_CHAIN_ID: u32 = 101;
const L2_CHAIN_ID: u32 = 202;

struct Protocol {
    env: Env,
    owner: Address,
    distribution: DistributionClient<'static>,
    deposit_token: token::Client<'static>,
    deposit_token_admin: token::StellarAssetClient<'static>,
    deposit_token_receiver: Address,
    reward_token: RewardTokenClient<'static>,
}

/// Distribution wired to a reward token on "L2" through the sender, the mock
/// gateway and the receiver.
fn setup_protocol() -> Protocol {
    let env = Env::default();
    env.mock_all_auths();

    let owner = Address::generate(&env);
    let deposit_token_receiver = Address::generate(&env);

    let distribution_id = env.register_contract(None, Distribution);
    let sender_id = env.register_contract(None, L1Sender);
    let gateway_id = env.register_contract(None, GatewayMock);
    let receiver_id = env.register_contract(None, L2MessageReceiver);
    let reward_token_id = env.register_contract(None, RewardToken);

    let deposit_token_id = env.register_stellar_asset_contract_v2(owner.clone()).address();
    let deposit_token = token::Client::new(&env, &deposit_token_id);
    let deposit_token_admin = token::StellarAssetClient::new(&env, &deposit_token_id);

    let reward_token = RewardTokenClient::new(&env, &reward_token_id);
    reward_token.initialize(
        &owner,
        &receiver_id,
        &(1_000_000 * TOKEN),
        &18,
        &String::from_str(&env, "Morpheus"),
        &String::from_str(&env, "MOR"),
    );

    let gateway = GatewayMockClient::new(&env, &gateway_id);
    gateway.initialize(&L1_CHAIN_ID);
    gateway.set_destination(&L2_CHAIN_ID, &receiver_id);

    L2MessageReceiverClient::new(&env, &receiver_id).initialize(
        &owner,
        &reward_token_id,
        &ReceiverConfig {
            gateway: gateway_id.clone(),
            sender: sender_id.clone().to_xdr(&env),
            sender_chain_id: L1_CHAIN_ID,
        },
    );

    SenderClient::new(&env, &sender_id).initialize(
        &owner,
        &SenderConfig {
            distribution: distribution_id.clone(),
            gateway: gateway_id,
            dst_chain_id: L2_CHAIN_ID,
            deposit_token: deposit_token_id.clone(),
            deposit_token_receiver: deposit_token_receiver.clone(),
        },
    );

    let distribution = DistributionClient::new(&env, &distribution_id);
    distribution.initialize(
        &owner,
        &DistributionConfig {
            deposit_token: deposit_token_id,
            l1_sender: sender_id,
        },
        &Vec::new(&env),
    );

    Protocol {
        env,
        owner,
        distribution,
        deposit_token,
        deposit_token_admin,
        deposit_token_receiver,
        reward_token,
    }
}

fn public_pool(initial_reward: i128, reward_decrease: i128) -> Pool {
    Pool {
        payout_start: DAY,
        decrease_interval: DAY,
        withdraw_lock_period: 0,
        claim_lock_period: 0,
        withdraw_lock_after_stake: 0,
        initial_reward,
        reward_decrease,
        minimal_stake: 0,
        is_public: true,
    }
}

fn private_pool(initial_reward: i128) -> Pool {
    Pool {
        is_public: false,
        ..public_pool(initial_reward, 0)
    }
}

fn set_time(env: &Env, timestamp: u64) {
    env.ledger().with_mut(|li| li.timestamp = timestamp);
}

fn staker(p: &Protocol, amount: i128) -> Address {
    let user = Address::generate(&p.env);
    p.deposit_token_admin.mint(&user, &amount);
    user
}

// ========== Pools ==========

#[test]
fn test_create_pools() {
    let p = setup_protocol();

    assert_eq!(p.distribution.get_owner(), p.owner);
    assert_eq!(p.distribution.version(), STORAGE_VERSION);
    assert_eq!(p.distribution.get_pool_count(), 0);

    let id = p.distribution.create_pool(&p.owner, &public_pool(100, 2));
    assert_eq!(id, 0);
    let id = p.distribution.create_pool(&p.owner, &private_pool(100));
    assert_eq!(id, 1);
    assert_eq!(p.distribution.get_pool_count(), 2);
    assert_eq!(p.distribution.get_pool(&1), private_pool(100));
}

#[test]
fn test_create_pool_validation() {
    let p = setup_protocol();
    let stranger = Address::generate(&p.env);

    let mut pool = public_pool(100, 2);
    pool.payout_start = 0;
    assert_eq!(
        p.distribution.try_create_pool(&p.owner, &pool),
        Err(Ok(DistributionError::InvalidPayoutStart))
    );

    let mut pool = public_pool(100, 2);
    pool.decrease_interval = 0;
    assert_eq!(
        p.distribution.try_create_pool(&p.owner, &pool),
        Err(Ok(DistributionError::InvalidDecreaseInterval))
    );

    assert_eq!(
        p.distribution.try_create_pool(&p.owner, &public_pool(-1, 0)),
        Err(Ok(DistributionError::InvalidPoolParams))
    );
    assert_eq!(
        p.distribution.try_create_pool(&stranger, &public_pool(100, 2)),
        Err(Ok(DistributionError::Unauthorized))
    );
}

#[test]
fn test_initialize_twice_fails() {
    let p = setup_protocol();
    let config = p.distribution.get_config();

    assert_eq!(
        p.distribution
            .try_initialize(&p.owner, &config, &vec![&p.env, public_pool(100, 2)]),
        Err(Ok(DistributionError::AlreadyInitialized))
    );
}

#[test]
fn test_edit_pool_cannot_change_type() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));

    assert_eq!(
        p.distribution.try_edit_pool(&p.owner, &0, &private_pool(100)),
        Err(Ok(DistributionError::InvalidPoolType))
    );
    assert_eq!(
        p.distribution.try_edit_pool(&p.owner, &7, &public_pool(100, 0)),
        Err(Ok(DistributionError::PoolNotFound))
    );
}

#[test]
fn test_edit_pool_settles_old_curve_first() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    let user = staker(&p, 1);

    p.distribution.stake(&user, &0, &1);

    set_time(&p.env, 3 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 200);

    p.distribution.edit_pool(&p.owner, &0, &public_pool(50, 0));
    assert_eq!(p.distribution.get_pool_data(&0).last_update, 3 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 200);

    // days four and five under the new curve only
    set_time(&p.env, 5 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 300);
}

#[test]
fn test_period_reward_query() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 2));

    assert_eq!(p.distribution.get_period_reward(&0, &0, &(3 * DAY)), 198);
    assert_eq!(p.distribution.get_period_reward(&0, &(3 * DAY), &DAY), 0);
}

// ========== Stake and Withdraw ==========

#[test]
fn test_current_user_reward_follows_curve() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 2));
    let user = staker(&p, 2);

    p.distribution.stake(&user, &0, &2);

    set_time(&p.env, DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 0);

    // 100 for the first day and 98 for the second
    set_time(&p.env, 3 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 198);
}

#[test]
fn test_constant_pool_pays_flat_reward() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    let user = staker(&p, 2);

    p.distribution.stake(&user, &0, &2);

    set_time(&p.env, 2 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 100);

    set_time(&p.env, 3 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 200);
}

#[test]
fn test_stake_moves_tokens_and_tracks_totals() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, 0));
    let user = staker(&p, 10 * TOKEN);

    p.distribution.stake(&user, &0, &(4 * TOKEN));

    assert_eq!(p.deposit_token.balance(&user), 6 * TOKEN);
    assert_eq!(
        p.deposit_token.balance(&p.distribution.address),
        4 * TOKEN
    );
    assert_eq!(p.distribution.get_user_data(&user, &0).deposited, 4 * TOKEN);
    assert_eq!(p.distribution.get_pool_data(&0).total_deposited, 4 * TOKEN);
    assert_eq!(p.distribution.total_deposited_in_public_pools(), 4 * TOKEN);
}

#[test]
fn test_stake_validation() {
    let p = setup_protocol();
    let mut pool = public_pool(100, 0);
    pool.minimal_stake = 10;
    p.distribution.create_pool(&p.owner, &pool);
    p.distribution.create_pool(&p.owner, &private_pool(100));
    let user = staker(&p, 100);

    assert_eq!(
        p.distribution.try_stake(&user, &0, &0),
        Err(Ok(DistributionError::NothingToStake))
    );
    assert_eq!(
        p.distribution.try_stake(&user, &0, &5),
        Err(Ok(DistributionError::AmountTooLow))
    );
    assert_eq!(
        p.distribution.try_stake(&user, &1, &50),
        Err(Ok(DistributionError::PoolNotPublic))
    );
    assert_eq!(
        p.distribution.try_stake(&user, &2, &50),
        Err(Ok(DistributionError::PoolNotFound))
    );

    p.distribution.stake(&user, &0, &10);
    // topping up below the minimum is fine once the total clears it
    p.distribution.stake(&user, &0, &5);
    assert_eq!(p.distribution.get_user_data(&user, &0).deposited, 15);
}

#[test]
fn test_single_unit_stake_keeps_pool_usable() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, 0));
    let dust = staker(&p, 1);
    let user = staker(&p, 10 * TOKEN);

    p.distribution.stake(&dust, &0, &1);

    set_time(&p.env, 2 * DAY);
    p.distribution.stake(&user, &0, &(10 * TOKEN));
    assert_eq!(p.distribution.get_current_user_reward(&0, &dust), 100 * TOKEN);

    assert_eq!(p.distribution.withdraw(&dust, &0, &WITHDRAW_ALL), 1);
    assert_eq!(p.distribution.claim(&dust, &0, &dust), 100 * TOKEN);
    assert_eq!(p.reward_token.balance(&dust), 100 * TOKEN);
}

#[test]
fn test_single_unit_allocation_in_private_pool() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &private_pool(500_000 * TOKEN));
    let user = Address::generate(&p.env);

    p.distribution
        .manage_users_in_private_pool(&p.owner, &0, &vec![&p.env, user.clone()], &vec![&p.env, 1]);

    set_time(&p.env, 2 * DAY);
    assert_eq!(p.distribution.claim(&user, &0, &user), 500_000 * TOKEN);
    assert_eq!(p.reward_token.balance(&user), 500_000 * TOKEN);
}

#[test]
fn test_withdraw_capped_by_balance_after_negative_rebase() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    let alice = staker(&p, 50);
    let bob = staker(&p, 50);

    p.distribution.stake(&alice, &0, &50);
    p.distribution.stake(&bob, &0, &50);

    // the deposit token loses 30 units held by the contract
    p.deposit_token.burn(&p.distribution.address, &30);

    assert_eq!(p.distribution.withdraw(&alice, &0, &WITHDRAW_ALL), 50);
    assert_eq!(p.distribution.withdraw(&bob, &0, &WITHDRAW_ALL), 20);
    assert_eq!(p.deposit_token.balance(&bob), 20);

    assert_eq!(p.distribution.get_user_data(&bob, &0).deposited, 30);
    assert_eq!(p.distribution.get_pool_data(&0).total_deposited, 30);
    assert_eq!(p.distribution.total_deposited_in_public_pools(), 30);
    assert_eq!(
        p.distribution.try_withdraw(&bob, &0, &WITHDRAW_ALL),
        Err(Ok(DistributionError::NothingToWithdraw))
    );
}

#[test]
fn test_withdraw_locks() {
    let p = setup_protocol();
    let mut pool = public_pool(100, 0);
    pool.withdraw_lock_period = 2 * DAY;
    pool.withdraw_lock_after_stake = DAY;
    p.distribution.create_pool(&p.owner, &pool);
    let user = staker(&p, 100);

    p.distribution.stake(&user, &0, &100);

    // before payout starts there is no lock
    p.distribution.withdraw(&user, &0, &10);

    set_time(&p.env, 2 * DAY);
    assert_eq!(
        p.distribution.try_withdraw(&user, &0, &10),
        Err(Ok(DistributionError::WithdrawLocked))
    );

    set_time(&p.env, 3 * DAY + 1);
    p.distribution.withdraw(&user, &0, &10);

    p.distribution.stake(&user, &0, &10);
    set_time(&p.env, 3 * DAY + 2);
    assert_eq!(
        p.distribution.try_withdraw(&user, &0, &10),
        Err(Ok(DistributionError::WithdrawLocked))
    );

    set_time(&p.env, 4 * DAY + 2);
    p.distribution.withdraw(&user, &0, &10);
    assert_eq!(p.deposit_token.balance(&user), 20);
}

#[test]
fn test_withdraw_amounts() {
    let p = setup_protocol();
    let mut pool = public_pool(100, 0);
    pool.minimal_stake = 10;
    p.distribution.create_pool(&p.owner, &pool);
    let user = staker(&p, 20);
    let stranger = Address::generate(&p.env);

    assert_eq!(
        p.distribution.try_withdraw(&stranger, &0, &1),
        Err(Ok(DistributionError::UserNotStaked))
    );

    p.distribution.stake(&user, &0, &20);

    assert_eq!(
        p.distribution.try_withdraw(&user, &0, &15),
        Err(Ok(DistributionError::InvalidWithdrawAmount))
    );
    assert_eq!(
        p.distribution.try_withdraw(&user, &0, &0),
        Err(Ok(DistributionError::NothingToWithdraw))
    );

    assert_eq!(p.distribution.withdraw(&user, &0, &WITHDRAW_ALL), 20);
    assert_eq!(p.deposit_token.balance(&user), 20);
    assert_eq!(p.distribution.get_pool_data(&0).total_deposited, 0);
    assert_eq!(p.distribution.total_deposited_in_public_pools(), 0);
}

#[test]
fn test_withdraw_keeps_earned_reward() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    let user = staker(&p, 4);

    p.distribution.stake(&user, &0, &4);

    set_time(&p.env, 2 * DAY + 1);
    p.distribution.withdraw(&user, &0, &WITHDRAW_ALL);

    let data = p.distribution.get_user_data(&user, &0);
    assert_eq!(data.deposited, 0);
    assert_eq!(data.pending_rewards, 100);

    // nothing more accrues without a deposit
    set_time(&p.env, 5 * DAY);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 100);
}

#[test]
fn test_deposits_are_conserved() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, TOKEN));
    let alice = staker(&p, 50 * TOKEN);
    let bob = staker(&p, 50 * TOKEN);
    let carol = staker(&p, 50 * TOKEN);

    p.distribution.stake(&alice, &0, &(10 * TOKEN));
    p.distribution.stake(&bob, &0, &(30 * TOKEN));
    set_time(&p.env, 2 * DAY);
    p.distribution.stake(&carol, &0, &(7 * TOKEN));
    p.distribution.withdraw(&bob, &0, &(12 * TOKEN));
    set_time(&p.env, 4 * DAY);
    p.distribution.withdraw(&alice, &0, &WITHDRAW_ALL);
    p.distribution.stake(&bob, &0, &TOKEN);

    let sum: i128 = [&alice, &bob, &carol]
        .iter()
        .map(|user| p.distribution.get_user_data(user, &0).deposited)
        .sum();
    assert_eq!(sum, p.distribution.get_pool_data(&0).total_deposited);
    assert_eq!(sum, 26 * TOKEN);
    assert_eq!(
        p.deposit_token.balance(&p.distribution.address),
        26 * TOKEN
    );
}

#[test]
fn test_rate_never_decreases() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, 3 * TOKEN));
    let alice = staker(&p, 100 * TOKEN);
    let bob = staker(&p, 100 * TOKEN);

    let mut last_rate = I256::from_i32(&p.env, 0);
    let mut check_rate = || {
        let rate = p.distribution.get_pool_data(&0).rate;
        assert!(rate >= last_rate);
        last_rate = rate;
    };

    p.distribution.stake(&alice, &0, &(5 * TOKEN));
    check_rate();
    for step in 1..=12u64 {
        set_time(&p.env, step * DAY / 2 + step * 17);
        if step % 3 == 0 {
            p.distribution.withdraw(&alice, &0, &TOKEN);
        } else {
            p.distribution.stake(&bob, &0, &(2 * TOKEN));
        }
        check_rate();
    }
}

// ========== Claim ==========

#[test]
fn test_claim_mints_on_l2() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, 0));
    let user = staker(&p, TOKEN);
    let receiver = Address::generate(&p.env);

    p.distribution.stake(&user, &0, &TOKEN);

    assert_eq!(
        p.distribution.try_claim(&user, &0, &receiver),
        Err(Ok(DistributionError::ClaimLocked))
    );

    set_time(&p.env, 2 * DAY);
    assert_eq!(p.distribution.claim(&user, &0, &receiver), 100 * TOKEN);
    assert_eq!(p.reward_token.balance(&receiver), 100 * TOKEN);

    let data = p.distribution.get_user_data(&user, &0);
    assert_eq!(data.pending_rewards, 0);
    assert_eq!(p.distribution.get_current_user_reward(&0, &user), 0);

    assert_eq!(
        p.distribution.try_claim(&user, &0, &receiver),
        Err(Ok(DistributionError::NothingToClaim))
    );
}

#[test]
fn test_claim_lock_period() {
    let p = setup_protocol();
    let mut pool = public_pool(100, 0);
    pool.claim_lock_period = DAY;
    p.distribution.create_pool(&p.owner, &pool);
    let user = staker(&p, 1);

    p.distribution.stake(&user, &0, &1);

    set_time(&p.env, 2 * DAY);
    assert_eq!(
        p.distribution.try_claim(&user, &0, &user),
        Err(Ok(DistributionError::ClaimLocked))
    );

    set_time(&p.env, 2 * DAY + 1);
    assert!(p.distribution.claim(&user, &0, &user) > 0);
}

#[test]
fn test_split_claims_pay_the_same_total() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100 * TOKEN, 2 * TOKEN));
    let alice = staker(&p, TOKEN);
    let bob = staker(&p, TOKEN);

    p.distribution.stake(&alice, &0, &TOKEN);
    p.distribution.stake(&bob, &0, &TOKEN);

    set_time(&p.env, 2 * DAY);
    p.distribution.claim(&alice, &0, &alice);
    set_time(&p.env, 3 * DAY + DAY / 3);
    p.distribution.claim(&alice, &0, &alice);
    set_time(&p.env, 5 * DAY);
    p.distribution.claim(&alice, &0, &alice);
    p.distribution.claim(&bob, &0, &bob);

    let alice_total = p.reward_token.balance(&alice);
    let bob_total = p.reward_token.balance(&bob);
    assert!((alice_total - bob_total).abs() <= 2);
    // 100 + 98 + 96 + 94 shared by two
    assert_eq!(bob_total, 194 * TOKEN);
}

// ========== Private Pools ==========

#[test]
fn test_private_pool_splits_by_stake() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &private_pool(100 * TOKEN));
    let small = Address::generate(&p.env);
    let large = Address::generate(&p.env);

    p.distribution.manage_users_in_private_pool(
        &p.owner,
        &0,
        &vec![&p.env, small.clone(), large.clone()],
        &vec![&p.env, TOKEN, 4 * TOKEN],
    );
    assert_eq!(p.distribution.get_pool_data(&0).total_deposited, 5 * TOKEN);
    // private pools hold no tokens
    assert_eq!(p.deposit_token.balance(&p.distribution.address), 0);
    assert_eq!(p.distribution.total_deposited_in_public_pools(), 0);

    set_time(&p.env, 2 * DAY);
    p.distribution.claim(&small, &0, &small);
    p.distribution.claim(&large, &0, &large);

    let small_reward = p.reward_token.balance(&small);
    let large_reward = p.reward_token.balance(&large);
    assert_eq!(small_reward, 20 * TOKEN);
    assert!((large_reward - 4 * small_reward).abs() <= TOKEN / 1000);
}

#[test]
fn test_manage_users_sets_absolute_amounts() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &private_pool(100));
    let user = Address::generate(&p.env);

    p.distribution
        .manage_users_in_private_pool(&p.owner, &0, &vec![&p.env, user.clone()], &vec![&p.env, 10]);
    p.distribution
        .manage_users_in_private_pool(&p.owner, &0, &vec![&p.env, user.clone()], &vec![&p.env, 3]);
    assert_eq!(p.distribution.get_user_data(&user, &0).deposited, 3);

    p.distribution
        .manage_users_in_private_pool(&p.owner, &0, &vec![&p.env, user.clone()], &vec![&p.env, 0]);
    assert_eq!(p.distribution.get_user_data(&user, &0).deposited, 0);
    assert_eq!(p.distribution.get_pool_data(&0).total_deposited, 0);
}

#[test]
fn test_manage_users_validation() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    p.distribution.create_pool(&p.owner, &private_pool(100));
    let user = Address::generate(&p.env);
    let stranger = Address::generate(&p.env);

    assert_eq!(
        p.distribution.try_manage_users_in_private_pool(
            &p.owner,
            &0,
            &vec![&p.env, user.clone()],
            &vec![&p.env, 1]
        ),
        Err(Ok(DistributionError::PoolIsPublic))
    );
    assert_eq!(
        p.distribution.try_manage_users_in_private_pool(
            &p.owner,
            &1,
            &vec![&p.env, user.clone()],
            &vec![&p.env, 1, 2]
        ),
        Err(Ok(DistributionError::InvalidLength))
    );
    assert_eq!(
        p.distribution.try_manage_users_in_private_pool(
            &stranger,
            &1,
            &vec![&p.env, user.clone()],
            &vec![&p.env, 1]
        ),
        Err(Ok(DistributionError::Unauthorized))
    );
}

// ========== Overplus ==========

#[test]
fn test_bridge_overplus_after_rebase() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    let user = staker(&p, 50 * TOKEN);

    p.distribution.stake(&user, &0, &(50 * TOKEN));
    assert_eq!(p.distribution.overplus(), 0);
    assert_eq!(
        p.distribution.try_bridge_overplus(&p.owner),
        Err(Ok(DistributionError::OverplusIsZero))
    );

    // the deposit token doubles in value
    p.deposit_token_admin
        .mint(&p.distribution.address, &(50 * TOKEN));
    assert_eq!(p.distribution.overplus(), 50 * TOKEN);

    assert_eq!(p.distribution.bridge_overplus(&p.owner), 50 * TOKEN);
    assert_eq!(
        p.deposit_token.balance(&p.distribution.address),
        50 * TOKEN
    );
    assert_eq!(
        p.deposit_token.balance(&p.deposit_token_receiver),
        50 * TOKEN
    );
    assert_eq!(p.distribution.overplus(), 0);

    // stakers keep their full deposit
    set_time(&p.env, 2 * DAY);
    assert_eq!(p.distribution.withdraw(&user, &0, &WITHDRAW_ALL), 50 * TOKEN);
}

// ========== Upgrades ==========

#[test]
fn test_migrate_rebuilds_public_deposit_counter() {
    let p = setup_protocol();
    p.distribution.create_pool(&p.owner, &public_pool(100, 0));
    p.distribution.create_pool(&p.owner, &private_pool(100));
    let user = staker(&p, 30);

    p.distribution.stake(&user, &0, &30);
    p.distribution
        .manage_users_in_private_pool(&p.owner, &1, &vec![&p.env, user.clone()], &vec![&p.env, 9]);

    assert_eq!(
        p.distribution.try_migrate(&p.owner),
        Err(Ok(DistributionError::UnsupportedMigration))
    );

    // roll the storage back to the first schema
    p.env.as_contract(&p.distribution.address, || {
        storage::set_version(&p.env, 1);
        storage::set_total_deposited_in_public_pools(&p.env, 0);
    });

    assert_eq!(p.distribution.migrate(&p.owner), 2);
    assert_eq!(p.distribution.version(), 2);
    assert_eq!(p.distribution.total_deposited_in_public_pools(), 30);
}

#[test]
fn test_owner_only_admin_functions() {
    let p = setup_protocol();
    let stranger = Address::generate(&p.env);
    let config = p.distribution.get_config();

    assert_eq!(
        p.distribution
            .try_upgrade(&stranger, &BytesN::from_array(&p.env, &[0; 32])),
        Err(Ok(DistributionError::Unauthorized))
    );
    assert_eq!(
        p.distribution.try_set_config(&stranger, &config),
        Err(Ok(DistributionError::Unauthorized))
    );
    assert_eq!(
        p.distribution.try_bridge_overplus(&stranger),
        Err(Ok(DistributionError::Unauthorized))
    );

    p.distribution.transfer_ownership(&p.owner, &stranger);
    assert_eq!(p.distribution.get_owner(), stranger);
    assert_eq!(
        p.distribution.try_migrate(&p.owner),
        Err(Ok(DistributionError::Unauthorized))
    );
}
