/*!
# DeviceHub DevKit - Utilitaires de test pour le kernel

Bibliothèque facilitant les tests bout-en-bout du kernel avec:
- Harness qui pilote le routeur HTTP en mémoire
- Utilisateurs de test pré-enregistrés
- Builders de schémas de contrôles et de devices
- Assertions sur les événements publiés
*/

pub mod fixtures;
pub mod test_utils;

pub use fixtures::{device_body, fan_device, SchemaBuilder};
pub use test_utils::{TestHarness, TestResponse};
