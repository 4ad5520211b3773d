#![allow(clippy::unwrap_used, clippy::expect_used)]

use atrium::{
    error::UploadError,
    features::{
        auth::LoginForm,
        chat::ChatRoom,
        files::{FileGallery, GalleryState, DELETED_MESSAGE},
        profile::{ProfileEditor, UPDATED_MESSAGE},
        todo::TodoList,
        welcome::Welcome,
    },
    identity::{memory::MemoryAuth, Credentials, Identity, IdentityProvider},
    media::{memory::MemoryMedia, MediaHost, MediaUpload, UploadedMedia},
    routes::{navigate, Navigation, Route},
    session::{PhotoSource, SessionStore},
    shell::{self, nav_items, NavItem},
    store::memory::{MemoryDocuments, MemoryKeyValue},
    BoxFuture,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Uploads normally but refuses every delete.
#[derive(Default)]
struct StickyMedia {
    inner: MemoryMedia,
}

impl MediaHost for StickyMedia {
    fn upload<'a>(
        &'a self,
        file: &'a MediaUpload,
    ) -> BoxFuture<'a, Result<UploadedMedia, UploadError>> {
        self.inner.upload(file)
    }

    fn delete<'a>(&'a self, _public_id: &'a str) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(async { Err(UploadError::Network("relay unreachable".to_string())) })
    }
}

/// Rejects every upload.
struct OfflineMedia;

impl MediaHost for OfflineMedia {
    fn upload<'a>(
        &'a self,
        _file: &'a MediaUpload,
    ) -> BoxFuture<'a, Result<UploadedMedia, UploadError>> {
        Box::pin(async { Err(UploadError::Network("offline".to_string())) })
    }

    fn delete<'a>(&'a self, _public_id: &'a str) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(async { Ok(()) })
    }
}

fn ada() -> Identity {
    Identity::new("U1")
        .with_email("ada@example.com")
        .with_display_name("Ada")
}

fn auth_with_ada() -> Arc<MemoryAuth> {
    let auth = Arc::new(MemoryAuth::new());
    auth.add_account(ada(), "hunter22");
    auth
}

async fn signed_in_session(media: Arc<dyn MediaHost>) -> (Arc<MemoryAuth>, SessionStore) {
    let auth = auth_with_ada();
    let session = SessionStore::init(auth.clone(), media);
    let mut form = LoginForm {
        email: "ada@example.com".to_string(),
        password: "hunter22".to_string(),
        error: None,
    };
    assert_eq!(form.submit_password(&session).await, Ok(Route::Home));
    session.wait_for(|snapshot| snapshot.identity.is_some()).await;
    (auth, session)
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login() {
    let session = SessionStore::init(auth_with_ada(), Arc::new(MemoryMedia::new()));

    let resolved = session.wait_for(|snapshot| !snapshot.loading).await;
    assert!(!resolved.is_authenticated());

    for path in ["/", "/profile", "/chat", "/todo", "/files"] {
        assert_eq!(
            navigate(path, &resolved),
            Navigation::Redirect(Route::Login),
            "{path}"
        );
    }
    assert!(matches!(
        navigate("/register", &resolved),
        Navigation::Render {
            route: Route::Register,
            ..
        }
    ));
    assert_eq!(
        nav_items(resolved.current_identity().as_ref()),
        vec![
            NavItem::Brand,
            NavItem::Link {
                label: "Login",
                route: Route::Login
            }
        ]
    );
}

#[tokio::test]
async fn login_opens_the_guarded_views() {
    let (_, session) = signed_in_session(Arc::new(MemoryMedia::new())).await;
    let snapshot = session.snapshot();

    assert!(!snapshot.loading);
    assert_eq!(session.current_identity(), Some(ada()));
    assert_eq!(
        navigate("/chat", &snapshot),
        Navigation::Render {
            route: Route::Chat,
            identity: Some(ada()),
        }
    );
    assert!(nav_items(Some(&ada())).contains(&NavItem::Logout));
    assert_eq!(Welcome::for_identity(&ada()).greeting, "Welcome, Ada!");
}

#[tokio::test]
async fn failed_login_keeps_the_session_anonymous() {
    let session = SessionStore::init(auth_with_ada(), Arc::new(MemoryMedia::new()));
    session.wait_for(|snapshot| !snapshot.loading).await;

    let mut form = LoginForm {
        email: "ada@example.com".to_string(),
        password: "wrong-password".to_string(),
        error: None,
    };
    assert!(form.submit_password(&session).await.is_err());
    assert_eq!(form.error.as_deref(), Some("Invalid email or password."));
    assert_eq!(session.current_identity(), None);
}

#[tokio::test]
async fn logout_redirects_previously_guarded_views() {
    let (auth, session) = signed_in_session(Arc::new(MemoryMedia::new())).await;

    assert_eq!(shell::logout(&session).await, Route::Login);

    // cleared before the provider notification arrives
    assert_eq!(session.current_identity(), None);
    assert_eq!(
        navigate("/profile", &session.snapshot()),
        Navigation::Redirect(Route::Login)
    );
    assert_eq!(auth.current_user(), None);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn profile_photo_upload_then_identity_update() {
    let media = Arc::new(MemoryMedia::new());
    let (_, session) = signed_in_session(media.clone()).await;

    let mut editor = ProfileEditor::open(&session).unwrap();
    assert_eq!(editor.display_name, "Ada");
    editor.display_name = "Alice".to_string();
    editor.choose_image(MediaUpload::new("me.png", "image/png", vec![1, 2, 3]));

    assert_eq!(editor.submit(&session).await, Ok(UPDATED_MESSAGE));
    assert_eq!(media.len(), 1);

    let identity = session.current_identity().unwrap();
    assert_eq!(identity.display_name.as_deref(), Some("Alice"));
    let photo_url = identity.photo_url.unwrap();
    assert!(photo_url.ends_with("/me.png"), "{photo_url}");
    assert_eq!(editor.photo_url, photo_url);
}

#[tokio::test]
async fn failed_photo_upload_skips_the_identity_update() {
    let (auth, session) = signed_in_session(Arc::new(OfflineMedia)).await;

    let result = session
        .update_profile(
            Some("Alice".to_string()),
            PhotoSource::Image(MediaUpload::new("me.png", "image/png", vec![1])),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(session.snapshot().profile_override, None);
    assert_eq!(
        session.current_identity().unwrap().display_name.as_deref(),
        Some("Ada")
    );

    // the provider still holds the original account
    let relogin = auth
        .sign_in_with_password(&Credentials::new("ada@example.com", "hunter22"))
        .await
        .unwrap();
    assert_eq!(relogin.display_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn name_only_edit_keeps_an_earlier_photo_change() {
    let (auth, session) = signed_in_session(Arc::new(MemoryMedia::new())).await;

    session
        .update_profile(None, PhotoSource::Url("https://img/ada.png".to_string()))
        .await
        .unwrap();
    let identity = session
        .update_profile(Some("Alice".to_string()), PhotoSource::Keep)
        .await
        .unwrap();
    assert_eq!(identity.photo_url.as_deref(), Some("https://img/ada.png"));

    let cached = session.current_identity().unwrap();
    assert_eq!(cached.display_name.as_deref(), Some("Alice"));
    assert_eq!(cached.photo_url.as_deref(), Some("https://img/ada.png"));
    assert_eq!(auth.current_user(), Some(cached));
}

#[tokio::test]
async fn todo_creation_writes_one_open_record_under_the_owner() {
    let store = Arc::new(MemoryKeyValue::new());
    let mut list = TodoList::open(store.clone(), "U1");

    let id = list.add("buy milk").await.unwrap().unwrap();

    let mut expected = Map::new();
    expected.insert(id.clone(), json!({ "text": "buy milk", "completed": false }));
    assert_eq!(store.get("todos/U1"), Some(Value::Object(expected)));
    assert_eq!(store.get("todos/U2"), None);
    let items = list.items();
    assert_eq!(items.len(), 1);
    assert!(!items[0].completed);

    list.toggle(&id).await.unwrap();
    assert!(list.items()[0].completed);

    list.close();
    assert!(!list.changed().await);
}

#[tokio::test]
async fn chat_messages_carry_the_sender() {
    let store = Arc::new(MemoryDocuments::new());
    let mut room = ChatRoom::open(store.clone(), ada());

    room.send("hello").await.unwrap();
    room.send("   ").await.unwrap();
    room.send("again").await.unwrap();

    let messages = room.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].record.text, "hello");
    assert!(messages.iter().all(|message| message.is_from(&ada())));
    assert!(messages[0].created_at < messages[1].created_at);

    room.close();
    assert_eq!(store.live_queries(), 0);
}

#[tokio::test]
async fn deleting_a_file_does_not_wait_on_the_media_host() {
    let documents = Arc::new(MemoryDocuments::new());
    let media = Arc::new(StickyMedia::default());
    let gallery = FileGallery::open(documents.clone(), media.clone(), "U1");

    let entry = gallery
        .upload(&MediaUpload::new("cat.png", "image/png", vec![1, 2]))
        .await
        .unwrap();
    let GalleryState::Ready(files) = gallery.state() else {
        panic!("gallery should be ready");
    };
    assert_eq!(files.len(), 1);
    assert!(files[0].is_image());

    assert_eq!(gallery.delete(&entry).await, Ok(DELETED_MESSAGE));

    assert_eq!(gallery.state(), GalleryState::Ready(Vec::new()));
    assert_eq!(documents.count("files"), 0);
    // the media host refused, so the asset is orphaned
    assert_eq!(media.inner.len(), 1);
}

#[tokio::test]
async fn teardown_stops_listening() {
    let (auth, session) = signed_in_session(Arc::new(MemoryMedia::new())).await;
    assert!(session.is_listening());

    session.teardown();
    assert!(!session.is_listening());

    // later provider transitions no longer reach the cache
    auth.sign_out().await.unwrap();
    tokio::task::yield_now().await;
    assert_eq!(session.current_identity(), Some(ada()));
}
