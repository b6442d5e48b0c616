//! End-to-end checks of cross-platform linking and the subscription
//! invariants, driven through the public core API against an in-memory store.

use std::sync::Arc;
use std::thread;

use mapsub_core::subscriptions::split_names;
use mapsub_core::{AccountResolver, CommandHandler, CommandOptions, Error, SubscriptionEngine};
use mapsub_db::Database;
use mapsub_types::Identity;

fn store() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn sorted_names(engine: &SubscriptionEngine, account: &mapsub_types::Account) -> Vec<String> {
    let mut listed: Vec<String> = engine
        .list_subscribed(account)
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    listed.sort();
    listed
}

#[test]
fn secret_links_discord_and_osu_to_one_account() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db);

    let discord = Identity::discord("42");
    let osu = Identity::osu("alice");

    let created = accounts.create(&discord).unwrap();
    let linked = accounts.register(&created.secret, &osu).unwrap();
    assert_eq!(linked.id, created.id);

    let via_discord = accounts.resolve(&discord).unwrap();
    engine.subscribe(&via_discord, &names(&["Sotarks", "Monstrata"])).unwrap();

    let via_osu = accounts.resolve(&osu).unwrap();
    assert_eq!(via_osu.id, via_discord.id);
    assert_eq!(sorted_names(&engine, &via_osu), sorted_names(&engine, &via_discord));
    assert_eq!(sorted_names(&engine, &via_osu), names(&["Monstrata", "Sotarks"]));
}

#[test]
fn create_twice_keeps_one_row() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let me = Identity::discord("42");

    accounts.create(&me).unwrap();
    assert!(matches!(accounts.create(&me), Err(Error::AlreadyExists { .. })));

    let rows: i64 = db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn secret_resolves_exact_account() {
    let db = store();
    let accounts = AccountResolver::new(db);

    let first = accounts.create(&Identity::discord("1")).unwrap();
    let second = accounts.create(&Identity::discord("2")).unwrap();
    assert_ne!(first.secret, second.secret);

    assert_eq!(accounts.resolve_by_secret(&first.secret).unwrap().id, first.id);
    assert_eq!(accounts.resolve_by_secret(&second.secret).unwrap().id, second.id);
    assert!(matches!(accounts.resolve_by_secret("not-a-secret"), Err(Error::InvalidSecret)));
}

#[test]
fn counts_follow_distinct_subscribers() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db);

    let a = accounts.create(&Identity::discord("1")).unwrap();
    let b = accounts.create(&Identity::discord("2")).unwrap();

    engine.subscribe(&a, &split_names("mapperX mapperY")).unwrap();
    let counts = engine.count_subscribers(&split_names("mapperX mapperY")).unwrap();
    let view: Vec<(&str, u64)> = counts.iter().map(|c| (c.name.as_str(), c.subscribers)).collect();
    assert_eq!(view, vec![("mapperX", 1), ("mapperY", 1)]);

    engine.subscribe(&b, &split_names("mapperX")).unwrap();
    let counts = engine.count_subscribers(&split_names("mapperX")).unwrap();
    assert_eq!(counts[0].subscribers, 2);

    // A repeat subscribe from the same account does not move the count
    engine.subscribe(&b, &split_names("mapperX")).unwrap();
    assert_eq!(engine.count_subscribers(&split_names("mapperX")).unwrap()[0].subscribers, 2);
}

#[test]
fn unsubscribe_missing_pair_leaves_counts_alone() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db);

    let a = accounts.create(&Identity::discord("1")).unwrap();
    let b = accounts.create(&Identity::discord("2")).unwrap();
    engine.subscribe(&a, &split_names("Sotarks")).unwrap();

    let summary = engine.unsubscribe(&b, &split_names("Sotarks")).unwrap();
    assert!(summary.unsubscribed.is_empty());
    assert_eq!(summary.not_subscribed, names(&["Sotarks"]));
    assert_eq!(engine.count_subscribers(&split_names("Sotarks")).unwrap()[0].subscribers, 1);
}

#[test]
fn top_returns_highest_counts_in_order() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db);

    // Mapper i gets i subscribers: m1 = 1, ..., m5 = 5
    let mappers = names(&["m1", "m2", "m3", "m4", "m5"]);
    for n in 0..5 {
        let account = accounts.create(&Identity::discord(n.to_string())).unwrap();
        engine.subscribe(&account, &mappers[n..]).unwrap();
    }

    let top: Vec<(String, u64)> = engine
        .top_mappers(3)
        .unwrap()
        .into_iter()
        .map(|r| (r.mapper.name, r.subscribers))
        .collect();
    assert_eq!(
        top,
        vec![("m5".to_string(), 5), ("m4".to_string(), 4), ("m3".to_string(), 3)]
    );
}

#[test]
fn top_breaks_ties_by_mapper_id() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db);

    let a = accounts.create(&Identity::discord("1")).unwrap();
    let b = accounts.create(&Identity::discord("2")).unwrap();
    engine.subscribe(&a, &split_names("zeta alpha")).unwrap();
    engine.subscribe(&b, &split_names("mid")).unwrap();

    let ids: Vec<i64> = engine.top_mappers(10).unwrap().iter().map(|r| r.mapper.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 3);
}

#[test]
fn concurrent_subscribes_store_one_row() {
    let db = store();
    let accounts = AccountResolver::new(db.clone());
    let engine = SubscriptionEngine::new(db.clone());
    let account = accounts.create(&Identity::discord("42")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let account = account.clone();
            thread::spawn(move || engine.subscribe(&account, &split_names("Sotarks")).unwrap())
        })
        .collect();

    let added: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap().subscribed.len())
        .sum();
    assert_eq!(added, 1);

    let rows: i64 = db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn chat_flow_across_platforms() {
    let handler = CommandHandler::new(store(), CommandOptions::default());
    let discord = Identity::discord("42");
    let irc = Identity::osu("alice");

    let init = handler.handle(&discord, ".init").unwrap();
    let secret = init.split('`').nth(1).unwrap().to_string();

    assert_eq!(handler.handle(&irc, &format!(".register {}", secret)).unwrap(), "Registered osu!.");
    handler.handle(&irc, ".sub Sotarks").unwrap();

    assert_eq!(
        handler.handle(&discord, ".list").unwrap(),
        handler.handle(&irc, ".list").unwrap()
    );
    assert_eq!(handler.handle(&discord, ".purge").unwrap(), "Unsubscribed from 1 mapper.");
    assert_eq!(handler.handle(&irc, ".list").unwrap(), "You aren't subscribed to anyone.");
}
