use chrono::Utc;
use strata_application::ChannelRepository;
use strata_core::DomainId;
use strata_domain::{Channel, Connection, ConnectionType};

use super::InMemoryChannelRepository;

fn domain() -> DomainId {
    DomainId::new("d1").unwrap_or_else(|_| unreachable!())
}

fn connection(channel_id: &str, client_id: &str, connection_type: ConnectionType) -> Connection {
    Connection {
        channel_id: channel_id.to_owned(),
        client_id: client_id.to_owned(),
        domain_id: domain(),
        connection_type,
    }
}

async fn repository_with(channel_ids: &[&str]) -> InMemoryChannelRepository {
    let repository = InMemoryChannelRepository::new();
    for channel_id in channel_ids {
        let channel = Channel::new(*channel_id, domain(), *channel_id, "user-1", Utc::now())
            .unwrap_or_else(|_| unreachable!());
        assert!(repository.create_channel(channel).await.is_ok());
    }
    repository
}

#[tokio::test]
async fn connection_is_direction_specific() {
    let repository = repository_with(&["ch1"]).await;
    let publish = connection("ch1", "cl1", ConnectionType::Publish);
    assert!(repository.add_connections(&[publish.clone()]).await.is_ok());

    assert!(matches!(repository.has_connection(&publish).await, Ok(true)));
    let subscribe = connection("ch1", "cl1", ConnectionType::Subscribe);
    assert!(matches!(repository.has_connection(&subscribe).await, Ok(false)));
}

#[tokio::test]
async fn deleting_a_channel_drops_its_connections() {
    let repository = repository_with(&["ch1", "ch2"]).await;
    let kept = connection("ch2", "cl1", ConnectionType::Publish);
    let _ = repository
        .add_connections(&[connection("ch1", "cl1", ConnectionType::Publish), kept.clone()])
        .await;

    assert!(repository.delete_channel("ch1").await.is_ok());
    assert!(matches!(repository.remove_client_connections("cl1").await, Ok(1)));
    assert!(matches!(repository.has_connection(&kept).await, Ok(false)));
}

#[tokio::test]
async fn connecting_to_unknown_channel_stores_nothing() {
    let repository = repository_with(&["ch1"]).await;
    let known = connection("ch1", "cl1", ConnectionType::Subscribe);

    let result = repository
        .add_connections(&[known.clone(), connection("missing", "cl1", ConnectionType::Publish)])
        .await;
    assert!(result.is_err());
    assert!(matches!(repository.has_connection(&known).await, Ok(false)));
}

#[tokio::test]
async fn removing_a_group_clears_channel_parents() {
    let repository = repository_with(&["ch1", "ch2"]).await;
    for (channel_id, group_id) in [("ch1", "g1"), ("ch2", "g2")] {
        let mut channel = repository
            .find_channel(channel_id)
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| unreachable!());
        channel.set_parent_group(Some(group_id.to_owned()));
        assert!(repository.update_channel(channel).await.is_ok());
    }

    let cleared = repository.unset_parent_groups(&["g1".to_owned()]).await;
    assert!(matches!(cleared, Ok(1)));

    let ch2 = repository.find_channel("ch2").await.unwrap_or_default();
    assert!(ch2.is_some_and(|channel| channel.parent_group_id() == Some("g2")));
}
