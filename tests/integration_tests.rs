use std::time::Duration;

use metacached::{Client, Error, Ttl};
use serial_test::parallel;

// NOTE: Each test should run with keys unique to that test to avoid async conflicts.  Because these tests run concurrently,
// it's possible to delete/overwrite keys created by another test before they're read.

async fn setup_client(keys: &[&str]) -> Client {
    let (client, mut pipeline) = Client::connect("tcp://127.0.0.1:11211")
        .await
        .expect("Failed to connect to server");

    tokio::spawn(async move {
        let _ = pipeline.run().await;
    });

    for key in keys {
        match client.delete(key).await {
            Ok(()) | Err(Error::KeyNotFound) => {}
            Err(e) => panic!("Failed to delete key {}: {}", key, e),
        }
    }

    client
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_set_and_get() {
    let key = "metacached-set-and-get";
    let client = setup_client(&[key]).await;

    let value = rand::random::<u64>().to_string();
    client.set(key, &value, None).await.unwrap();

    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found.as_deref(), Some(value.as_str()));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_get_with_nonexistent_key() {
    let key = "metacached-nonexistent-key";
    let client = setup_client(&[key]).await;

    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found, None);
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_add_on_existing_key() {
    let key = "metacached-add-twice";
    let client = setup_client(&[key]).await;

    client
        .add(key, &String::from("foo"), None)
        .await
        .expect("first add should store");

    let result = client.add(key, &String::from("bar"), None).await;
    assert!(matches!(result, Err(Error::KeyExists)));

    // The original value survives the failed add.
    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found.as_deref(), Some("foo"));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_replace_missing_key() {
    let key = "metacached-replace-missing";
    let client = setup_client(&[key]).await;

    let result = client.replace(key, &String::from("x"), None).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_append_and_prepend() {
    let key = "metacached-append-prepend";
    let client = setup_client(&[key]).await;

    client.set(key, &String::from("bbb"), None).await.unwrap();
    client.append(key, &String::from("ccc")).await.unwrap();
    client.prepend(key, &String::from("aaa")).await.unwrap();

    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found.as_deref(), Some("aaabbbccc"));

    let missing = "metacached-append-missing";
    let result = client.append(missing, &String::from("x")).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_delete() {
    let key = "metacached-delete";
    let client = setup_client(&[key]).await;

    client.set(key, &String::from("gone"), None).await.unwrap();
    client.delete(key).await.unwrap();

    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found, None);

    let result = client.delete(key).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_touch_to_indefinite() {
    let key = "metacached-touch-indefinite";
    let client = setup_client(&[key]).await;

    client
        .set(
            key,
            &String::from("foo"),
            Some(Ttl::expires_in(Duration::from_secs(1))),
        )
        .await
        .unwrap();
    client.touch(key, Ttl::Indefinitely).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let found: Option<String> = client.get(key).await.unwrap();
    assert_eq!(found.as_deref(), Some("foo"));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_touch_missing_key() {
    let key = "metacached-touch-missing";
    let client = setup_client(&[key]).await;

    let result = client.touch(key, Ttl::Indefinitely).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_increment_and_decrement() {
    let key = "metacached-counter";
    let client = setup_client(&[key]).await;

    client.set(key, &1u64, None).await.unwrap();

    let value: u64 = client.increment(key, 100).await.unwrap();
    assert_eq!(value, 101);

    let found: Option<u64> = client.get(key).await.unwrap();
    assert_eq!(found, Some(101));

    let value: u64 = client.decrement(key, 1).await.unwrap();
    assert_eq!(value, 100);
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_increment_missing_key() {
    let key = "metacached-counter-missing";
    let client = setup_client(&[key]).await;

    let result: Result<u64, Error> = client.increment(key, 1).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_increment_from_seeds_missing_key() {
    let key = "metacached-counter-seeded";
    let client = setup_client(&[key]).await;

    let value: u64 = client.increment_from(key, 10, 5, None).await.unwrap();
    assert_eq!(value, 5);

    let value: u64 = client.increment_from(key, 10, 5, None).await.unwrap();
    assert_eq!(value, 15);
}

#[ignore = "Relies on a running memcached server"]
#[tokio::test]
#[parallel]
async fn test_pipelined_producers_share_one_connection() {
    let client = setup_client(&[]).await;

    let mut tasks = Vec::new();
    for i in 0..16u64 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let key = format!("metacached-pipelined-{}", i);
            client.set(&key, &i, None).await.unwrap();
            let found: Option<u64> = client.get(&key).await.unwrap();
            assert_eq!(found, Some(i));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}
