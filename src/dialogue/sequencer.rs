//! Randomized topic ordering for a session.

use rand::Rng;

use crate::models::enums::Topic;

/// Produce the topic order for a new session: a uniform Fisher–Yates
/// shuffle of the base set with the terminal `Report` topic appended last.
///
/// Invoked only on session start or explicit reset, never mid-session.
pub fn shuffled_topic_order<R: Rng>(rng: &mut R) -> Vec<Topic> {
    let mut order = Topic::BASE.to_vec();
    for i in (1..order.len()).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }
    order.push(Topic::Report);
    order
}
