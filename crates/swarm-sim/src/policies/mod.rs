mod crawling;
mod floating;
mod swirling;

pub use crawling::CrawlingPolicy;
pub use floating::FloatingPolicy;
pub use swirling::SwirlingPolicy;

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Affine3A;

    use crate::policy::PolicyContext;
    use crate::ring::HistoryRing;

    pub fn context(instance_count: u32, time: f32) -> PolicyContext {
        PolicyContext {
            history: HistoryRing::new(instance_count, 16).uniforms(),
            random_seed: 3,
            time,
            world_to_local: Affine3A::IDENTITY,
        }
    }
}
