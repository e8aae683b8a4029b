use std::time::Duration;

use ic_exports::{
    ic_cdk::spawn,
    ic_cdk_timers::{set_timer, set_timer_interval},
};

use crate::{
    cleanup::{daily_cleanup, reseed_master_rng},
    journal::{JournalEntry, LogType},
};

pub fn start_timers() {
    // seed the master RNG as soon as the install call has finished
    set_timer(Duration::ZERO, || {
        spawn(async {
            if let Err(error) = reseed_master_rng().await {
                JournalEntry::new(Err(error), LogType::Info)
                    .note("Failed to seed the master RNG at startup.")
                    .commit();
            }
        })
    });

    // CLEANUP TIMER | EVERY 24 HOURS
    set_timer_interval(Duration::from_secs(86_400), || spawn(daily_cleanup()));
}
