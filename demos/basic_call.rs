//! Basic example demonstrating simple GET and POST requests.
//!
//! This example shows how to:
//! - Build URLs from an endpoint, resource and name
//! - Decode JSON responses into your own types
//! - Send JSON bodies and accept a non-200 status
//! - Preset the endpoint and resource with a `ResourceHandle`
//!
//! Run with: `cargo run --example basic_call`

use restcall::decoder::expect_status;
use restcall::{Context, Error, ResourceHandle, Transport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[derive(Debug, Serialize)]
struct PostFilter {
    #[serde(rename = "userId")]
    user_id: u32,
}

const ENDPOINT: &str = "https://jsonplaceholder.typicode.com";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restcall=debug,basic_call=info")
        .init();

    let transport = Transport::builder().user_agent("restcall-demo/0.1")?.build()?;
    let ctx = Context::background();

    println!("=== GET Request Example ===");
    let post: Option<Post> = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("posts")
        .name("1")
        .call(&ctx, &[])
        .await?;

    if let Some(post) = post {
        println!("Post ID: {}", post.id);
        println!("Title: {}", post.title);
        println!("Body: {}", post.body);
    }
    println!();

    println!("=== Query Example ===");
    let posts: Option<Vec<Post>> = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("posts")
        .queries(&PostFilter { user_id: 1 })
        .call(&ctx, &[])
        .await?;
    println!("User 1 has {} posts", posts.map_or(0, |p| p.len()));
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let created: Option<Post> = transport
        .post()
        .endpoint(ENDPOINT)
        .resource("posts")
        .json(&new_post)
        .call(&ctx, &[expect_status(http::StatusCode::CREATED)])
        .await?;
    println!("Created post: {:?}", created);
    println!();

    println!("=== Resource Handle Example ===");
    let comments = ResourceHandle::new(ENDPOINT, "comments").to_transport(transport.clone());
    let raw = comments.get().query("postId", ["1"]).bytes(&ctx).await?;
    println!("Raw comments payload: {} bytes", raw.len());

    Ok(())
}
