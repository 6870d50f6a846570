use rand::RngExt;

pub const STARTED: [&str; 5] = [
    "What's up {id}? Got something to share with the class?",
    "Oooh whatcha typing there {id}?",
    "Let's see that message {id} 👀",
    "Excited to see what you're typing out {id}",
    "Oh sorry {id}, don't let me interrupt you",
];

pub const PAUSED: [&str; 5] = [
    "Huh? Why'd you stop?",
    "Well don't let me stop you",
    "No no keep going, I wanted to see what you were saying",
    "Taking a breather?",
    "Yeah, okay, let those fingers rest for a bit",
];

pub const RESUMED: [&str; 5] = [
    "Oh? Welcome back?",
    "Come back to finish what you started?",
    "Good to see you back on the grind",
    "Back at it again!",
    "Hopefully worth the wait",
];

/// Maps a set length to a chosen index; injectable so tests are deterministic.
pub type Chooser = Box<dyn Fn(usize) -> usize + Send + Sync>;

pub struct PhraseBank {
    chooser: Chooser,
}

impl PhraseBank {
    pub fn new() -> Self {
        Self::with_chooser(Box::new(|len| rand::rng().random_range(0..len)))
    }

    pub fn with_chooser(chooser: Chooser) -> Self {
        Self { chooser }
    }

    fn pick(&self, set: &'static [&'static str]) -> &'static str {
        set[(self.chooser)(set.len()).min(set.len() - 1)]
    }

    /// A "typing started" line with the user's mention substituted in.
    pub fn started(&self, mention: &str) -> String {
        self.pick(&STARTED).replace("{id}", mention)
    }

    pub fn paused(&self) -> String {
        self.pick(&PAUSED).to_string()
    }

    pub fn resumed(&self) -> String {
        self.pick(&RESUMED).to_string()
    }
}
