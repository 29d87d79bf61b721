//! Backend health probe.

use std::error::Error;

use crate::api::fetch_health;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub async fn show_status(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let health = fetch_health(&client, base_url).await?;

    println!("Backend:             {base_url}");
    println!("Status:              {}", health.status);
    println!("Assistant ready:     {}", yes_no(health.assistant_ready));
    match health.files_uploaded {
        Some(count) => println!("Files uploaded:      {count}"),
        None => println!("Files uploaded:      unknown"),
    }
    println!("Mode:                {}", health.mode.as_deref().unwrap_or("unknown"));
    println!(
        "Assistant type:      {}",
        health.assistant_type.as_deref().unwrap_or("unknown")
    );
    println!("Streaming available: {}", yes_no(health.streaming_available));

    Ok(())
}
