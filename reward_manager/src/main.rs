//! Generates the candid file automatically

use reward_manager::RewardManager;

fn main() {
    let canister_e_idl = RewardManager::idl();
    let idl = candid::pretty::candid::compile(&canister_e_idl.env.env, &Some(canister_e_idl.actor));

    println!("{}", idl);
}
