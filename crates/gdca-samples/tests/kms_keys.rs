//! KMS samples against a live project.

use gdca_samples::kms;
use gdca_testutil::fixtures::KmsFixture;
use gdca_testutil::TestContext;

#[tokio::test]
async fn create_key_asymmetric_decrypt() {
    let Some(tc) = TestContext::system() else { return };
    let mut client = tc.client().unwrap();
    let mut fixture = KmsFixture::new(&client, &tc.project_id).await.unwrap();

    let id = fixture.random_id();
    let mut out = Vec::new();
    let key = kms::create_key_asymmetric_decrypt(&mut client, &mut out, &fixture.key_ring_name, &id)
        .await
        .unwrap();
    assert_eq!(key.name, format!("{}/cryptoKeys/{}", fixture.key_ring_name, id));
    assert!(String::from_utf8(out).unwrap().contains("Created key:"));

    fixture.cleanup().await.unwrap();
}
