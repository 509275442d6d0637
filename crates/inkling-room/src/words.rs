//! The built-in word pool and word-option picking.

use rand::Rng;

/// Built-in nouns offered to drawers.
pub const WORD_POOL: &[&str] = &[
    // things
    "apple", "banana", "cactus", "bottle", "castle", "dragon", "camera", "guitar", "rocket",
    "mountain", "pencil", "notebook", "cookie", "window", "island", "sketch", "pyramid", "pirate",
    "rainbow", "airplane", "dolphin", "diamond", "painter", "sunrise", "lantern", "piano",
    "laptop", "planet", "compass",
    // animals
    "butterfly", "elephant", "giraffe", "kangaroo", "penguin", "octopus", "flamingo", "hedgehog",
    "squirrel", "hamster", "rabbit", "turtle", "lizard", "spider", "beetle", "dragonfly",
    "ladybug", "caterpillar", "grasshopper", "firefly",
    // food
    "sandwich", "hamburger", "pizza", "spaghetti", "chocolate", "strawberry", "watermelon",
    "pineapple", "coconut", "avocado", "broccoli", "carrot", "tomato", "potato", "onion",
    "garlic", "pepper", "mushroom", "cucumber", "lettuce",
    // tech
    "computer", "keyboard", "monitor", "speaker", "headphone", "microphone", "telephone",
    "television", "radio", "printer", "scanner", "tablet", "smartphone", "desktop", "software",
    "hardware", "internet", "website",
    // vehicles
    "bicycle", "motorcycle", "helicopter", "submarine", "spaceship", "train", "bus", "truck",
    "car", "boat", "ship", "yacht", "canoe", "kayak", "skateboard", "scooter", "rollerblade",
    "snowboard",
];

/// Built-in words plus custom words, filtered to `max_len` characters,
/// without duplicates. Built-in words come first.
pub fn candidate_pool(max_len: usize, custom: &[String]) -> Vec<String> {
    let mut pool: Vec<String> = Vec::with_capacity(WORD_POOL.len() + custom.len());
    let builtin = WORD_POOL.iter().map(|w| (*w).to_string());
    let custom = custom
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty());
    for word in builtin.chain(custom) {
        if word.chars().count() <= max_len && !pool.contains(&word) {
            pool.push(word);
        }
    }
    pool
}

/// Picks up to `n` distinct words from the candidate pool.
pub fn pick_words<R: Rng>(rng: &mut R, n: usize, max_len: usize, custom: &[String]) -> Vec<String> {
    let mut pool = candidate_pool(max_len, custom);
    let target = n.min(pool.len());
    // Partial Fisher-Yates: the first `target` slots end up a uniform sample.
    for i in 0..target {
        let j = rng.random_range(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(target);
    pool
}
