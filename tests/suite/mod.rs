mod pipeline;
mod provider;
