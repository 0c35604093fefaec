//! Client constructors pointed at a mock neuron server

use neuron_client::{ClientConfig, NeuronClient};

use super::mock_neuron::MockNeuron;

/// Unauthenticated client for the mock
pub fn anonymous(mock: &MockNeuron) -> NeuronClient {
    NeuronClient::new(ClientConfig::default().with_base_url(mock.base_url())).expect("valid client config")
}

/// Client for the mock with a stored credential
pub fn with_credential(mock: &MockNeuron, credential: &str) -> NeuronClient {
    NeuronClient::new(
        ClientConfig::default()
            .with_base_url(mock.base_url())
            .with_credential(credential),
    )
    .expect("valid client config")
}
