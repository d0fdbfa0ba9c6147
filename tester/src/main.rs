use serde_json::{Value, json};

const BASE: &str = "http://localhost:1111";

#[tokio::main]
async fn main() {
    let http = reqwest::Client::new();

    let session: Value = http
        .post(format!("{BASE}/register"))
        .json(&json!({ "email": "reader@example.com", "password": "Password1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    println!("session: {session}");
    let token = session["token"].as_str().unwrap();

    let books: Value = http
        .get(format!("{BASE}/books"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    println!("available: {books}");

    let Some(first) = books.as_array().and_then(|list| list.first()) else {
        println!("No available books, add one as an admin first.");
        return;
    };
    let book_id = first["id"].as_str().unwrap();

    let borrowed = http
        .post(format!("{BASE}/books/{book_id}/borrow"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    println!("borrow: {}", borrowed.status());
    println!("{}", borrowed.text().await.unwrap());

    let returned = http
        .post(format!("{BASE}/books/{book_id}/return"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    println!("return: {}", returned.status());
    println!("{}", returned.text().await.unwrap());

    let history = http
        .get(format!("{BASE}/books/{book_id}/history"))
        .send()
        .await
        .unwrap();
    println!("history: {}", history.text().await.unwrap());
}
