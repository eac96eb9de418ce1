use async_trait::async_trait;

use crate::providers::{CandidateProvider, SourceKind};
use crate::{Author, FilterCriteria, Metrics, Post, ProviderError};

struct Seed {
    id: &'static str,
    name: &'static str,
    handle: &'static str,
    avatar: &'static str,
    content: &'static str,
    posted_at: &'static str,
    metrics: [u64; 4],
    viral_potential: u32,
    verified: bool,
}

const SEEDS: [Seed; 10] = [
    Seed {
        id: "t1",
        name: "Elon Musk",
        handle: "elonmusk",
        avatar: "https://pbs.twimg.com/profile_images/1683325380441128960/yRsRRjGO_400x400.jpg",
        content: "Excited to announce Tesla's new AI features coming next month. This will revolutionize how we think about autonomous driving! 🚗",
        posted_at: "2 minutes ago",
        metrics: [15_432, 2_133, 3_540, 1_200_000],
        viral_potential: 92,
        verified: true,
    },
    Seed {
        id: "t2",
        name: "Sam Altman",
        handle: "sama",
        avatar: "https://pbs.twimg.com/profile_images/804990434455887872/BG0Xh7Oa_400x400.jpg",
        content: "AGI will create more jobs than it destroys. The transition will be challenging but ultimately beneficial for humanity.",
        posted_at: "5 minutes ago",
        metrics: [8_753, 921, 1_320, 540_000],
        viral_potential: 85,
        verified: true,
    },
    Seed {
        id: "t3",
        name: "Paul Graham",
        handle: "paulg",
        avatar: "https://pbs.twimg.com/profile_images/1824002576/pg-railsconf_400x400.jpg",
        content: "The most successful founders I've known are relentlessly resourceful. They find a way to make things work, no matter what.",
        posted_at: "10 minutes ago",
        metrics: [5_321, 312, 782, 220_000],
        viral_potential: 78,
        verified: true,
    },
    Seed {
        id: "t4",
        name: "Balaji Srinivasan",
        handle: "balajis",
        avatar: "https://pbs.twimg.com/profile_images/1654276609091723265/WyJTBI20_400x400.jpg",
        content: "The internet is becoming the operating system of our society. Those who understand this shift will build the next trillion-dollar companies.",
        posted_at: "15 minutes ago",
        metrics: [3_810, 289, 605, 150_000],
        viral_potential: 74,
        verified: true,
    },
    Seed {
        id: "t5",
        name: "Tech Enthusiast",
        handle: "techlover2023",
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=techlover",
        content: "Just tried the new MacBook Pro with M3 chip. It's blazing fast! 🔥 Anyone else using it for development work?",
        posted_at: "20 minutes ago",
        metrics: [215, 42, 18, 9_500],
        viral_potential: 45,
        verified: false,
    },
    Seed {
        id: "t6",
        name: "CryptoWhale",
        handle: "crypto_whale",
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=crypto",
        content: "Bitcoin is about to make a major move. The charts are showing a classic pattern we haven't seen since the 2017 bull run.",
        posted_at: "25 minutes ago",
        metrics: [1_842, 352, 421, 82_000],
        viral_potential: 68,
        verified: false,
    },
    Seed {
        id: "t7",
        name: "Climate Activist",
        handle: "savetheplanet",
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=climate",
        content: "New study shows we only have 8 years to drastically reduce carbon emissions before irreversible climate damage. We need action NOW.",
        posted_at: "30 minutes ago",
        metrics: [4_210, 892, 1_532, 195_000],
        viral_potential: 82,
        verified: false,
    },
    Seed {
        id: "t8",
        name: "Startup Founder",
        handle: "founderlife",
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=founder",
        content: "Just closed our Series A! $12M to revolutionize how people shop online. Hiring engineers, designers, and product managers!",
        posted_at: "35 minutes ago",
        metrics: [923, 154, 87, 45_000],
        viral_potential: 56,
        verified: false,
    },
    Seed {
        id: "t9",
        name: "Mark Zuckerberg",
        handle: "zuck",
        avatar: "https://pbs.twimg.com/profile_images/1657776563098845184/Jo17rUEr_400x400.jpg",
        content: "The metaverse isn't just virtual reality. It's a new layer of reality that will enhance our physical world in ways we can't yet imagine.",
        posted_at: "40 minutes ago",
        metrics: [11_562, 2_451, 2_184, 890_000],
        viral_potential: 89,
        verified: true,
    },
    Seed {
        id: "t10",
        name: "Gaming News",
        handle: "gamingnews",
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=gaming",
        content: "BREAKING: Sony announces PlayStation 6 development has officially begun. Expected release date in 2026.",
        posted_at: "45 minutes ago",
        metrics: [7_621, 1_893, 2_942, 520_000],
        viral_potential: 87,
        verified: false,
    },
];

/// Curated demo batch. Always available; terminal link of every chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn candidates(&self) -> Vec<Post> {
        SEEDS.iter().map(seed_to_post).collect()
    }
}

#[async_trait]
impl CandidateProvider for MockProvider {
    fn source(&self) -> SourceKind {
        SourceKind::Mock
    }

    async fn fetch(&self, _criteria: &FilterCriteria) -> Result<Vec<Post>, ProviderError> {
        Ok(self.candidates())
    }
}

fn seed_to_post(seed: &Seed) -> Post {
    let [likes, replies, retweets, views] = seed.metrics;
    Post {
        id: seed.id.to_string(),
        author: Author {
            name: seed.name.to_string(),
            handle: seed.handle.to_string(),
            avatar: seed.avatar.to_string(),
        },
        content: seed.content.to_string(),
        posted_at: seed.posted_at.to_string(),
        metrics: Metrics {
            likes,
            replies,
            retweets,
            views,
        },
        viral_potential: seed.viral_potential,
        is_verified: seed.verified,
        is_saved: false,
    }
}
