//! The `mastery init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mastery.toml").exists() {
        println!("mastery.toml already exists, skipping.");
    } else {
        std::fs::write("mastery.toml", SAMPLE_CONFIG)?;
        println!("Created mastery.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: mastery validate --bank banks/example.toml");
    println!("  2. Run: mastery ingest --attempts attempts.json --bank banks/example.toml");
    println!("  3. Run: mastery profile --user <uuid> --bank banks/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mastery configuration

state_path = "./mastery-state.json"
default_max_questions = 10
max_topics = 5
assignment_due_days = 7
max_retries = 8
parallelism = 4
# seed = 42
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Question Bank"
description = "A small bank to get started"
default_difficulty = "easy"

[[questions]]
id = "00000000-0000-4000-8000-000000000001"
title = "Reverse a string"
description = "Return the characters of a string in reverse order."
topic = "Strings"
question_type = "coding"
tags = ["basics"]

[[questions]]
id = "00000000-0000-4000-8000-000000000002"
title = "Find the maximum"
description = "Return the largest element of a non-empty array."
topic = "Arrays"
difficulty = "medium"
question_type = "multi_step"
xp_reward = 15

[[questions.steps]]
step_number = 1
description = "Pick a starting value"
hints = ["Which element is a safe first guess?", "Start from the first element"]
solution = "let mut best = xs[0];"

[[questions.steps]]
step_number = 2
description = "Scan the rest of the array"
hints = ["Compare each element with the best so far"]
solution = "for &x in &xs[1..] { if x > best { best = x; } }"
"#;
