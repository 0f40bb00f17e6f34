//! Typed fragment model for pod templates.

mod container;
mod keyed;
mod pod;
mod quantity;
mod volume;

pub use container::{
    Container, ContainerPort, EnvVar, HttpGetAction, Probe, Protocol, ResourceRequirements,
    Scheme, TcpSocketAction,
};
pub use keyed::{DuplicateKey, Keyed, KeyedList};
pub use pod::{ObjectMeta, PodSpec, PodTemplate};
pub use quantity::{Quantity, QuantityError};
pub use volume::{
    ConfigMapVolumeSource, EmptyDirVolumeSource, ProjectedVolumeSource, SecretVolumeSource,
    ServiceAccountTokenProjection, Volume, VolumeMount, VolumeProjection,
};
