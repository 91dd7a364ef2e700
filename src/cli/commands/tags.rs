//! Tag listing command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_tags(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let tags = store.list_tags().await?;

    if tags.is_empty() {
        println!("No tags yet.");
        return Ok(());
    }

    println!("Tags ({} total)", tags.len());
    println!("{:-<40}", "");
    for tag in tags {
        println!("{:>5}  {}", tag.id, tag.name);
    }

    Ok(())
}
