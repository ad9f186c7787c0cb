use std::{collections::HashMap, path::PathBuf};

use agora_client::{
    api::{Author, Comment, CommentId, Forest, Post, PostId, Time, UserId},
    tree, Config,
};
use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Prints a random comment tree for a post, as the JSON the server would send
#[derive(structopt::StructOpt)]
struct Opt {
    /// Id of the generated post
    #[structopt(long, default_value = "p1")]
    post: String,

    /// Number of comments to generate
    #[structopt(short, long, default_value = "100")]
    comments: usize,

    /// Number of distinct authors
    #[structopt(short, long, default_value = "5")]
    users: usize,

    /// Deepest reply nesting, root comments being at depth 0
    #[structopt(long, default_value = "6")]
    max_depth: usize,

    /// Seed, for reproducible output
    #[structopt(long)]
    seed: Option<u64>,

    /// JSON client configuration the output must satisfy
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
}

const ROOT_PROBABILITY: f64 = 0.2;
const LIKE_PROBABILITY: f64 = 0.3;
const MAX_WORDS: usize = 40;

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let path = match path {
        None => return Ok(Config::default()),
        Some(p) => p,
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration file {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("parsing configuration file {path:?}"))
}

fn gen_text(rng: &mut StdRng, max_len: usize) -> String {
    let mut words = rng.gen_range(1..=MAX_WORDS);
    loop {
        let text = lipsum::lipsum_words_with_rng(&mut *rng, words);
        if text.len() <= max_len || words == 1 {
            return text;
        }
        words /= 2;
    }
}

fn gen_forest(opt: &Opt, cfg: &Config, start: Time, rng: &mut StdRng) -> Forest {
    let users = (0..opt.users.max(1))
        .map(|i| Author {
            id: UserId::new(format!("u{i}")),
            name: format!("User {i}"),
            avatar: None,
        })
        .collect::<Vec<_>>();

    let mut forest = Forest::new();
    let mut depths = HashMap::<CommentId, usize>::new();
    let mut repliable = Vec::<CommentId>::new();
    for i in 0..opt.comments {
        let id = CommentId(format!("c{}", i + 1));
        let author = users.choose(&mut *rng).unwrap_or(&users[0]);
        let at = start + Duration::minutes(i as i64);
        let mut comment = Comment::new(id.clone(), author, gen_text(rng, cfg.max_text_len), at);
        for u in users.iter() {
            if rng.gen_bool(LIKE_PROBABILITY) {
                comment.liked_by.insert(u.id.clone());
            }
        }

        let parent = match repliable.is_empty() || rng.gen_bool(ROOT_PROBABILITY) {
            true => None,
            false => repliable.choose(&mut *rng).cloned(),
        };
        let depth = match &parent {
            None => 0,
            Some(p) => depths[p] + 1,
        };
        forest = match &parent {
            None => tree::add_root(&forest, comment),
            Some(p) => tree::add_reply(&forest, p, comment),
        };
        depths.insert(id.clone(), depth);
        if depth < opt.max_depth {
            repliable.push(id);
        }
    }
    forest
}

fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt::init();
    }
    let opt = <Opt as structopt::StructOpt>::from_args();
    let cfg = load_config(opt.config.as_ref())?;
    let seed = opt.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, comments = opt.comments, "generating comments");
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc
        .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .context("building the date of the first comment")?;

    let post = Post {
        id: PostId::new(opt.post.clone()),
        comments: gen_forest(&opt, &cfg, start, &mut rng),
    };
    post.validate(cfg.max_text_len)
        .context("generated comments are invalid")?;
    let comments = post.comments.iter().collect::<Vec<_>>();
    let json = serde_json::to_string_pretty(&comments).context("serializing comments")?;
    println!("{json}");
    Ok(())
}
