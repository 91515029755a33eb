use clip_core::{clip_reference_for, ForumClient, Settings};
use reddit_client::{RedditClient, RedditCredentials};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Clip listing dry run ===\n");

    let settings_path = Settings::path_from_env();
    let settings = Settings::load_or_scaffold(&settings_path)?;
    settings.validate()?;

    let client = RedditClient::new(RedditCredentials::from(&settings.reddit))?;
    client.authenticate().await?;
    println!("Authenticated as u/{}\n", client.username());

    for name in &settings.communities {
        let community = match client.get_community(name).await {
            Ok(community) => community,
            Err(e) => {
                println!("r/{}: {}", name, e);
                continue;
            }
        };
        println!("r/{} ({} subscribers)", community.name, community.subscribers);

        let mut posts = client.list_recent(&community, 30).await?;
        posts.extend(client.list_trending(&community, 15).await?);
        for post in &posts {
            if let Some(clip) = clip_reference_for(post) {
                println!("  [{}] {} -> {}", post.id, post.title, clip);
            }
        }
        println!();
    }

    Ok(())
}
