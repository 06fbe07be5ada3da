mod common;

use shelfwise_common::{ActivityKind, Error, GroupRole, NewGroup, Page};

fn group(name: &str, is_private: bool) -> NewGroup {
    NewGroup {
        name: name.to_string(),
        description: None,
        is_private,
    }
}

#[tokio::test]
async fn public_groups_are_open_to_everyone() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;

    let club = db.create_group(&ana, &group("Sci-fi Club", false)).await.unwrap();
    assert_eq!(club.member_count, 1);
    assert!(matches!(
        db.create_group(&ben, &group("Sci-fi Club", false)).await,
        Err(Error::Conflict(_))
    ));

    assert!(db.join_group(&ben, club.group.id).await.unwrap());
    assert!(!db.join_group(&ben, club.group.id).await.unwrap());

    let members = db.group_members(&ben, club.group.id).await.unwrap();
    let roles: Vec<(&str, GroupRole)> = members
        .iter()
        .map(|m| (m.username.as_str(), m.role))
        .collect();
    assert_eq!(roles, vec![("ana", GroupRole::Owner), ("ben", GroupRole::Member)]);

    let kinds: Vec<ActivityKind> = db
        .group_activities(&ben, club.group.id, None, Page::default())
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.activity.kind)
        .collect();
    assert_eq!(kinds, vec![ActivityKind::GroupJoined, ActivityKind::GroupCreated]);

    db.leave_group(&ben, club.group.id).await.unwrap();
    assert_eq!(db.group(club.group.id).await.unwrap().member_count, 1);
    assert!(matches!(
        db.leave_group(&ben, club.group.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn private_groups_need_a_manager() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;
    let cara = common::reader(&db, "cara").await;

    let circle = db.create_group(&ana, &group("Quiet Circle", true)).await.unwrap();
    let id = circle.group.id;

    assert!(matches!(db.join_group(&ben, id).await, Err(Error::Forbidden(_))));
    assert!(matches!(db.group_members(&ben, id).await, Err(Error::Forbidden(_))));
    assert!(matches!(
        db.add_group_member(&cara, id, ben.id).await,
        Err(Error::Forbidden(_))
    ));

    assert!(db.add_group_member(&ana, id, ben.id).await.unwrap());
    assert_eq!(db.group_members(&ben, id).await.unwrap().len(), 2);

    // private group activity stays out of non-members' feeds
    db.follow(&cara, ana.id).await.unwrap();
    let outsiders_feed = db.feed(&cara, None, Page::default()).await.unwrap();
    assert!(outsiders_feed.is_empty());
    assert!(matches!(
        db.group_activities(&cara, id, None, Page::default()).await,
        Err(Error::Forbidden(_))
    ));
}

#[tokio::test]
async fn the_owner_cannot_leave() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let club = db.create_group(&ana, &group("Book Club", false)).await.unwrap();

    assert!(matches!(
        db.leave_group(&ana, club.group.id).await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        db.create_group(&ana, &group("  ", false)).await,
        Err(Error::Invalid(_))
    ));
    assert!(matches!(db.group(9999).await, Err(Error::NotFound(_))));
}
