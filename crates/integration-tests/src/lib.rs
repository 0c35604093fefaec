//! End-to-end tests for `neuron-client` live in `tests/`
