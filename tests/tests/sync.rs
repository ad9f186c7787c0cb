use std::time::Duration;

use agora_client::{
    api::{Action, Author, CommentId, Error, Forest, Network, PostId, UserId},
    ActionState, Config, Coordinator, ForestExt, MemoryCache, Notification, Outcome,
};
use agora_mock_server::{Fault, MockServer, MockSession};
use futures::channel::mpsc::UnboundedReceiver;

type Client = Coordinator<MemoryCache, MockSession>;

/// What both sides must agree on. Edit times are stamped independently by
/// the client and the server, so they are left out.
#[derive(Debug, Eq, PartialEq)]
struct Shape {
    id: CommentId,
    text: String,
    likes: Vec<UserId>,
    children: Vec<Shape>,
}

fn shape(forest: &Forest) -> Vec<Shape> {
    forest
        .iter()
        .map(|c| Shape {
            id: c.id.clone(),
            text: c.text.clone(),
            likes: c.liked_by.iter().cloned().collect(),
            children: shape(&c.children),
        })
        .collect()
}

fn author(id: &str) -> Author {
    Author {
        id: UserId::new(id),
        name: format!("User {id}"),
        avatar: None,
    }
}

fn id(s: &str) -> CommentId {
    CommentId::new(s)
}

fn post() -> PostId {
    PostId::new("p1")
}

fn init_logs() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
}

/// Server with post `p1` holding `c1 [c2]`, `c3`, all written by `u0`
async fn seeded_server() -> MockServer {
    init_logs();
    let server = MockServer::new();
    server.create_post(post());
    let u0 = server.session(author("u0"));
    u0.create_reply(&post(), None, "first").await.unwrap();
    u0.create_reply(&post(), Some(&id("c1")), "second").await.unwrap();
    u0.create_reply(&post(), None, "third").await.unwrap();
    server
}

async fn client(server: &MockServer, user: &str) -> (Client, UnboundedReceiver<Notification>) {
    let (coord, notifs) = Coordinator::new(
        MemoryCache::new(),
        server.session(author(user)),
        author(user),
        Config::default(),
    );
    coord.refetch(&post()).await.unwrap();
    (coord, notifs)
}

fn server_comments(server: &MockServer) -> Forest {
    server.comments(&post()).unwrap()
}

#[tokio::test]
async fn nested_reply_round_trip() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u1").await;

    let outcome = coord
        .submit(&post(), Action::reply(id("c2"), "deep"))
        .await
        .unwrap();
    let created = match outcome {
        Outcome::Confirmed(Some(c)) => c,
        o => panic!("unexpected outcome {o:?}"),
    };
    assert_eq!(created.id, id("c4"));
    assert_eq!(created.author_id, coord.viewer().id);
    assert_eq!(coord.comments(&post()), server_comments(&server));
    assert_eq!(
        coord.comments(&post()).locate(&id("c4")).map(|l| l.parent),
        Some(Some(id("c2")))
    );
    assert!(notifs.try_next().is_err());
}

#[tokio::test]
async fn rejected_reply_rolls_back() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u1").await;
    let before = coord.comments(&post());

    let err = Error::Unknown(String::from("database is on fire"));
    server.inject(Fault::Reject(err.clone()));
    let outcome = coord
        .submit(&post(), Action::reply(id("c1"), "hello"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::RolledBack(err.clone()));
    assert_eq!(coord.comments(&post()), before);
    assert_eq!(coord.comments(&post()), server_comments(&server));

    let notif = notifs.try_next().unwrap().unwrap();
    assert_eq!(notif.action, Action::reply(id("c1"), "hello"));
    assert_eq!(notif.error, err);
}

#[tokio::test]
async fn lost_response_is_repaired_by_refetch() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u1").await;

    server.inject(Fault::LoseResponse);
    let outcome = coord.submit(&post(), Action::root("hello")).await.unwrap();
    assert_eq!(outcome.state(), ActionState::RolledBack);
    assert!(notifs.try_next().unwrap().is_some());

    // the server did store the comment, only the client does not know yet
    assert!(!coord.comments(&post()).contains_id(&id("c4")));
    assert!(server_comments(&server).contains_id(&id("c4")));

    let fetched = coord.network().fetch_comments(&post()).await.unwrap();
    assert!(fetched.iter().any(|c| c.id == id("c4")));

    coord.refetch(&post()).await.unwrap();
    assert_eq!(coord.comments(&post()), server_comments(&server));
}

#[tokio::test]
async fn offline_actions_all_roll_back() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u0").await;
    let before = coord.comments(&post());

    server.set_offline(true);
    let actions = vec![
        Action::reply(id("c2"), "hi"),
        Action::root("hi"),
        Action::Edit {
            comment_id: id("c1"),
            text: String::from("edited"),
        },
        Action::ToggleLike {
            comment_id: id("c3"),
        },
        Action::Delete {
            comment_id: id("c1"),
        },
    ];
    for action in actions.iter() {
        let outcome = coord.submit(&post(), action.clone()).await.unwrap();
        assert!(matches!(outcome, Outcome::RolledBack(Error::Network(_))));
        assert_eq!(coord.comments(&post()), before, "{action:?}");
        assert_eq!(&notifs.try_next().unwrap().unwrap().action, action);
    }
    assert!(coord.refetch(&post()).await.is_err());

    server.set_offline(false);
    coord.refetch(&post()).await.unwrap();
    assert_eq!(coord.comments(&post()), before);
}

#[tokio::test]
async fn touching_someone_elses_comment_is_denied() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u1").await;
    let before = shape(&coord.comments(&post()));

    let edit = Action::Edit {
        comment_id: id("c1"),
        text: String::from("mine now"),
    };
    let outcome = coord.submit(&post(), edit).await.unwrap();
    assert_eq!(outcome, Outcome::RolledBack(Error::PermissionDenied));
    let c1 = coord.comments(&post()).find(&id("c1")).cloned().unwrap();
    assert_eq!(c1.text, "first");
    assert_eq!(c1.updated_at, None);

    let delete = Action::Delete {
        comment_id: id("c1"),
    };
    let outcome = coord.submit(&post(), delete).await.unwrap();
    assert_eq!(outcome, Outcome::RolledBack(Error::PermissionDenied));
    assert_eq!(shape(&coord.comments(&post())), before);
    assert_eq!(shape(&server_comments(&server)), before);

    assert_eq!(notifs.try_next().unwrap().unwrap().error, Error::PermissionDenied);
    assert_eq!(notifs.try_next().unwrap().unwrap().error, Error::PermissionDenied);
}

#[tokio::test]
async fn likes_from_several_users() {
    let server = seeded_server().await;
    let (alice, _) = client(&server, "u1").await;
    let (bob, _) = client(&server, "u2").await;
    let like = || Action::ToggleLike {
        comment_id: id("c2"),
    };

    alice.submit(&post(), like()).await.unwrap();
    bob.submit(&post(), like()).await.unwrap();
    alice.refetch(&post()).await.unwrap();
    let c2 = alice.comments(&post()).find(&id("c2")).cloned().unwrap();
    assert!(c2.is_liked_by(&UserId::new("u1")));
    assert!(c2.is_liked_by(&UserId::new("u2")));

    alice.submit(&post(), like()).await.unwrap();
    let c2 = alice.comments(&post()).find(&id("c2")).cloned().unwrap();
    assert!(!c2.is_liked_by(&UserId::new("u1")));
    assert!(c2.is_liked_by(&UserId::new("u2")));
    assert_eq!(alice.comments(&post()), server_comments(&server));
}

#[tokio::test]
async fn concurrent_actions_all_land() {
    let server = seeded_server().await;
    let (coord, mut notifs) = client(&server, "u0").await;
    server.set_latency(Duration::from_millis(10));

    let p = post();
    let (edit, like, reply) = tokio::join!(
        coord.submit(
            &p,
            Action::Edit {
                comment_id: id("c2"),
                text: String::from("edited"),
            }
        ),
        coord.submit(
            &p,
            Action::ToggleLike {
                comment_id: id("c2"),
            }
        ),
        coord.submit(&p, Action::reply(id("c2"), "nested")),
    );
    for outcome in [edit, like, reply] {
        assert_eq!(outcome.unwrap().state(), ActionState::Confirmed);
    }
    assert!(notifs.try_next().is_err());

    let forest = coord.comments(&post());
    assert!(!forest.ids().iter().any(|i| i.is_temporary()));
    assert_eq!(shape(&forest), shape(&server_comments(&server)));
    let c2 = forest.find(&id("c2")).unwrap();
    assert_eq!(c2.text, "edited");
    assert!(c2.is_liked_by(&UserId::new("u0")));
    assert_eq!(c2.children.len(), 1);
}

#[tokio::test]
async fn reply_racing_parent_deletion_converges() {
    let server = seeded_server().await;
    let (coord, _notifs) = client(&server, "u0").await;
    server.set_latency(Duration::from_millis(10));

    let p = post();
    let (reply, delete) = tokio::join!(
        coord.submit(&p, Action::reply(id("c2"), "too late")),
        coord.submit(
            &p,
            Action::Delete {
                comment_id: id("c1"),
            }
        ),
    );
    reply.unwrap();
    assert_eq!(delete.unwrap().state(), ActionState::Confirmed);

    // whichever call the server handled first, both sides end up agreeing
    let forest = coord.comments(&post());
    assert_eq!(forest.ids(), vec![id("c3")]);
    assert_eq!(shape(&forest), shape(&server_comments(&server)));
}
